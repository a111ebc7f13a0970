use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use hindsight_core::budget::TextBudgeter;
use hindsight_core::channel_info::ChannelInfoParser;
use hindsight_core::diff::diff;
use hindsight_core::document::Document;
use hindsight_core::normalize::{
    message_document, slack_link_document, unfurling_link_document, NormalizeError,
};
use hindsight_core::payload::{MessageContext, MessagePayload};
use hindsight_core::team::ConfigValidationError;
use hindsight_db::repositories::TeamRepository;
use hindsight_index::{IndexGateway, VectorIndexEngine};

use crate::client::SlackApi;
use crate::dispatch::{EventHandler, EventHandlerError};
use crate::events::{EventCallback, MessageChange, MessageEvent, SlackEvent, SlackEventType};
use crate::replies;

/// Keeps the index in step with channel messages.
///
/// Creation and edits upsert the message document under its deterministic
/// id; qualifying attachments are diffed against the previous revision so
/// edits only touch the link documents that actually changed. Topic and
/// purpose changes are routed to the settings confirmation flow.
pub struct MessageHandler {
    slack: Arc<dyn SlackApi>,
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
}

impl MessageHandler {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        teams: Arc<dyn TeamRepository>,
        engine: Arc<dyn VectorIndexEngine>,
    ) -> Self {
        Self { slack, teams, engine }
    }

    async fn ingest(
        &self,
        callback: &EventCallback,
        event: &MessageEvent,
        message: &MessagePayload,
        previous: Option<&MessagePayload>,
    ) -> Result<(), EventHandlerError> {
        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let budgeter = TextBudgeter::new(&team.model)?;
        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        gateway.ensure_index().await?;

        let ctx = MessageContext {
            team_id: callback.team_id.clone(),
            channel_id: event.channel_id.clone(),
            channel_type: event.channel_type.clone(),
            event_time: callback.event_time,
        };

        let permalink = self.slack.get_permalink(&event.channel_id, &message.ts).await?;
        let document = message_document(&budgeter, &ctx, message, &permalink)?;
        gateway.add_message_document(&document).await?;

        let current = link_documents(&budgeter, &ctx, message)?;
        let previous = previous
            .map(|previous| link_documents(&budgeter, &ctx, previous))
            .transpose()?;
        let (added, removed) = diff(&current, previous.as_deref());

        for document in &removed {
            gateway
                .delete_file_or_attachment(&document.metadata.file_or_attachment_id)
                .await?;
        }
        gateway.add_documents(&added).await?;

        info!(
            team_id = %team.team_id,
            ts = %message.ts,
            added = added.len(),
            removed = removed.len(),
            "ingested message"
        );
        Ok(())
    }

    async fn delete(
        &self,
        callback: &EventCallback,
        previous_ts: &str,
    ) -> Result<(), EventHandlerError> {
        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        // Link documents carry the message `ts`, so one filter removes the
        // message and everything built from its attachments.
        gateway.delete_message(previous_ts).await?;
        info!(team_id = %team.team_id, ts = previous_ts, "deleted message documents");
        Ok(())
    }

    /// Confirms or rejects the settings a member wrote into the channel
    /// topic or description.
    async fn channel_info_changed(
        &self,
        callback: &EventCallback,
        event: &MessageEvent,
    ) -> Result<(), EventHandlerError> {
        let info = self.slack.conversations_info(&event.channel_id).await?;
        let reply = match ChannelInfoParser::new(&info.topic, &info.purpose).parse() {
            Ok(overrides) if overrides == Default::default() => None,
            Ok(_) => Some(replies::CONFIGURATION_SET.to_string()),
            Err(ConfigValidationError::TemperatureRange(_)) => {
                Some(replies::temperature_apology())
            }
            Err(ConfigValidationError::TimezoneOffsetSelect(_)) => {
                Some(replies::timezone_apology())
            }
            Err(_) => Some(replies::GENERIC_APOLOGY.to_string()),
        };
        if let Some(reply) = reply {
            self.slack.post_message(&event.channel_id, None, &reply).await?;
        }
        info!(team_id = %callback.team_id, channel_id = %event.channel_id, "changed channel info");
        Ok(())
    }
}

/// Every attachment document a message produces right now.
fn link_documents(
    budgeter: &TextBudgeter,
    ctx: &MessageContext,
    message: &MessagePayload,
) -> Result<Vec<Document>, NormalizeError> {
    let mut documents = Vec::new();
    for attachment in &message.attachments {
        if let Some(document) = slack_link_document(budgeter, ctx, message, attachment)? {
            documents.push(document);
        }
        if let Some(document) = unfurling_link_document(budgeter, ctx, message, attachment)? {
            documents.push(document);
        }
    }
    Ok(documents)
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        let SlackEvent::Message(event) = &callback.event else {
            return Ok(());
        };

        match &event.change {
            MessageChange::Created { message } => {
                self.ingest(callback, event, message, None).await
            }
            MessageChange::Changed { message, previous } => {
                self.ingest(callback, event, message, Some(previous)).await
            }
            MessageChange::Deleted { previous_ts } => self.delete(callback, previous_ts).await,
            MessageChange::ChannelTopic | MessageChange::ChannelPurpose => {
                self.channel_info_changed(callback, event).await
            }
            MessageChange::Unsupported { subtype } => {
                debug!(team_id = %callback.team_id, subtype, "skipping message subtype");
                Ok(())
            }
        }
    }
}
