use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use hindsight_core::budget::TextBudgeter;
use hindsight_core::channel_info::ChannelInfoParser;
use hindsight_db::repositories::TeamRepository;
use hindsight_index::{IndexGateway, VectorIndexEngine};
use hindsight_slack::events::{AppMentionEvent, EventCallback, SlackEvent, SlackEventType};
use hindsight_slack::{EventHandler, EventHandlerError, SlackApi};

use crate::chain::{ChainSettings, ChatChain};
use crate::error::{apology_for, AgentError};
use crate::llm::ChatModel;
use crate::memory::ConversationMemory;
use crate::tools::Retriever;

/// Answers `app_mention` events in their thread.
///
/// Failures never bubble past this handler as silence: every error
/// category maps to an apology posted into the same thread.
pub struct AppMentionHandler {
    slack: Arc<dyn SlackApi>,
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
    model: Arc<dyn ChatModel>,
}

impl AppMentionHandler {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        teams: Arc<dyn TeamRepository>,
        engine: Arc<dyn VectorIndexEngine>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self { slack, teams, engine, model }
    }

    async fn reply(
        &self,
        callback: &EventCallback,
        mention: &AppMentionEvent,
        thread_ts: &str,
    ) -> Result<String, AgentError> {
        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let info = self.slack.conversations_info(&mention.channel_id).await?;
        let overrides = ChannelInfoParser::new(&info.topic, &info.purpose).parse()?;

        let temperature = overrides.temperature.unwrap_or(team.temperature);
        let timezone_offset = overrides.timezone_offset.unwrap_or_else(|| team.timezone_offset.clone());
        let context = overrides.context.unwrap_or_else(|| team.context.clone());

        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        gateway.ensure_index().await?;
        let retriever = Retriever::new(
            gateway,
            self.model.clone(),
            &team.model,
            temperature,
            info.is_private,
            &mention.channel_id,
            thread_ts,
        );

        let settings = ChainSettings {
            bot_id: callback.bot_id.clone(),
            channel_id: mention.channel_id.clone(),
            model: team.model.clone(),
            temperature,
            context,
            timezone_offset,
        };
        let mut chain = ChatChain::new(
            self.model.clone(),
            Arc::new(retriever),
            TextBudgeter::new(&team.model)?,
            ConversationMemory::new(TextBudgeter::new(&team.model)?),
            settings,
        );

        let replies = self.slack.conversations_replies(&mention.channel_id, thread_ts).await?;
        let (input, history) = match replies.split_last() {
            Some((last, history)) => (last.clone(), history),
            None => (mention.message.clone(), &[][..]),
        };
        for message in history {
            if message.user == callback.bot_id {
                chain.add_bot_message(message)?;
            } else {
                chain.add_user_message(message)?;
            }
        }

        chain.run(&input).await
    }
}

#[async_trait]
impl EventHandler for AppMentionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        let SlackEvent::AppMention(mention) = &callback.event else {
            return Ok(());
        };
        if mention.edited {
            debug!(team_id = %callback.team_id, ts = %mention.message.ts, "skipping edited mention");
            return Ok(());
        }

        let thread_ts = mention.message.thread_or_ts().to_string();
        let reply = match self.reply(callback, mention, &thread_ts).await {
            Ok(answer) => {
                info!(team_id = %callback.team_id, thread_ts = %thread_ts, "replied to mention");
                answer
            }
            Err(err) => {
                error!(team_id = %callback.team_id, error = %err, "mention reply failed");
                apology_for(&err)
            }
        };
        self.slack.post_message(&mention.channel_id, Some(&thread_ts), &reply).await?;
        Ok(())
    }
}
