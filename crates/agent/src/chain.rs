//! The mention-reply conversation loop.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use hindsight_core::budget::{TextBudgeter, NESTED_FIELD_TOKEN_BUDGET};
use hindsight_core::classify::{is_pdf_file, is_plain_text_file, is_slack_link, is_unfurling_link};
use hindsight_core::document::{pretty_json, timestamp_from_epoch};
use hindsight_core::payload::MessagePayload;

use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel};
use crate::memory::ConversationMemory;
use crate::prompt::{
    self, FINAL_ANSWER_ACTION, SLACK_CONVERSATION_SEARCH_NAME, SLACK_URL_SEARCH_NAME,
};
use crate::tools::RetrievalTools;

/// Tool rounds before the chain stops asking for more lookups.
const MAX_STEPS: usize = 5;

/// Effective per-reply settings after channel overrides are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSettings {
    pub bot_id: String,
    pub channel_id: String,
    pub model: String,
    pub temperature: f64,
    pub context: String,
    pub timezone_offset: String,
}

/// Drives one threaded reply: replayed history, an action-loop over the
/// retrieval tools, and the final answer.
pub struct ChatChain {
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn RetrievalTools>,
    memory: ConversationMemory,
    budgeter: TextBudgeter,
    settings: ChainSettings,
}

impl ChatChain {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn RetrievalTools>,
        budgeter: TextBudgeter,
        memory: ConversationMemory,
        settings: ChainSettings,
    ) -> Self {
        Self { model, tools, memory, budgeter, settings }
    }

    /// Replays one of the bot's own earlier messages into memory.
    pub fn add_bot_message(&mut self, message: &MessagePayload) -> Result<(), AgentError> {
        let formatted =
            format_message(&self.budgeter, &self.settings.timezone_offset, message, true)?;
        self.memory.add_assistant(formatted);
        Ok(())
    }

    /// Replays an earlier member message into memory.
    pub fn add_user_message(&mut self, message: &MessagePayload) -> Result<(), AgentError> {
        let formatted =
            format_message(&self.budgeter, &self.settings.timezone_offset, message, true)?;
        self.memory.add_user(formatted);
        Ok(())
    }

    pub async fn run(&mut self, message: &MessagePayload) -> Result<String, AgentError> {
        let time_message = time_message_at(Utc::now(), &self.settings.timezone_offset);
        let context = if self.settings.context.is_empty() {
            "Not set"
        } else {
            &self.settings.context
        };
        let input = format!(
            "Human: {}",
            format_message(&self.budgeter, &self.settings.timezone_offset, message, false)?
        );

        let mut messages = vec![ChatMessage::system(prompt::system_message(
            &self.settings.bot_id,
            &self.settings.channel_id,
            &time_message,
            context,
        ))];
        messages.extend_from_slice(self.memory.messages());
        messages.push(ChatMessage::user(prompt::tools_message(&input)));

        for _ in 0..MAX_STEPS {
            let response = self
                .model
                .chat(&self.settings.model, self.settings.temperature, &messages)
                .await?;

            let Some((action, action_input)) = parse_action(&response) else {
                // The model skipped the blob format; take its text as the answer.
                return Ok(response);
            };
            if action == FINAL_ANSWER_ACTION {
                return Ok(action_input);
            }

            debug!(action = %action, "running tool");
            let observation = match action.as_str() {
                SLACK_CONVERSATION_SEARCH_NAME => {
                    self.tools.conversation_search(&action_input).await?
                }
                SLACK_URL_SEARCH_NAME => self.tools.url_search(&action_input).await?,
                _ => format!("`{action}` is not a valid tool."),
            };
            messages.push(ChatMessage::assistant(response));
            messages.push(ChatMessage::user(format!(
                "TOOL RESPONSE:\n---------------------\n{observation}\n\n\
                 Respond with a markdown code snippet of a json blob with a single action."
            )));
        }

        warn!(channel_id = %self.settings.channel_id, "tool step limit reached");
        let response = self
            .model
            .chat(&self.settings.model, self.settings.temperature, &messages)
            .await?;
        Ok(match parse_action(&response) {
            Some((action, action_input)) if action == FINAL_ANSWER_ACTION => action_input,
            _ => response,
        })
    }
}

/// Extracts the `{action, action_input}` blob from a model response.
fn parse_action(response: &str) -> Option<(String, String)> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    let value: Value = serde_json::from_str(&response[start..=end]).ok()?;
    let action = value.get("action")?.as_str()?.to_string();
    let action_input = match value.get("action_input") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Some((action, action_input))
}

/// One line of the system prompt anchoring the model in time. Workspaces
/// off UTC get a local clock and an instruction to respect it.
fn time_message_at(now: DateTime<Utc>, timezone_offset: &str) -> String {
    if timezone_offset == "+00:00" {
        format!("Current time is '{}'. ", now.to_rfc3339())
    } else {
        let local = now.with_timezone(&parse_offset(timezone_offset));
        format!("Current local time is '{}'. Respect local timezone by default. ", local.to_rfc3339())
    }
}

fn parse_offset(timezone_offset: &str) -> FixedOffset {
    fn east_seconds(offset: &str) -> Option<i32> {
        let sign = match offset.chars().next()? {
            '+' => 1,
            '-' => -1,
            _ => return None,
        };
        let (hours, minutes) = offset[1..].split_once(':')?;
        Some(sign * (hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60))
    }
    east_seconds(timezone_offset)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("utc offset"))
}

/// Renders a message the way the model sees it: an action record with the
/// truncated text and the same attachment summaries its indexed document
/// carries.
fn format_message(
    budgeter: &TextBudgeter,
    timezone_offset: &str,
    message: &MessagePayload,
    with_timestamp: bool,
) -> Result<String, AgentError> {
    let mut content = json!({
        "user_id": message.user,
        "action": "Message",
        "action_input": budgeter.truncate(&message.text, None)?,
    });

    if with_timestamp {
        let epoch = message.ts.parse::<f64>().unwrap_or_default() as i64;
        let local = timestamp_from_epoch(epoch)?.with_timezone(&parse_offset(timezone_offset));
        content["timestamp"] = local.to_rfc3339().into();
    }

    let unfurling_links = message
        .attachments
        .iter()
        .filter(|attachment| is_unfurling_link(attachment))
        .map(|attachment| {
            Ok(json!({
                "title": truncate_nested(budgeter, attachment.title.as_deref())?,
                "permalink": truncate_nested(budgeter, attachment.original_url.as_deref())?,
            }))
        })
        .collect::<Result<Vec<_>, AgentError>>()?;
    if !unfurling_links.is_empty() {
        content["unfurling_links"] = unfurling_links.into();
    }

    let slack_links = message
        .attachments
        .iter()
        .filter(|attachment| is_slack_link(attachment))
        .map(|attachment| {
            Ok(json!({
                "author": attachment.author_id,
                "content": truncate_nested(budgeter, attachment.text.as_deref())?,
                "permalink": truncate_nested(budgeter, attachment.original_url.as_deref())?,
            }))
        })
        .collect::<Result<Vec<_>, AgentError>>()?;
    if !slack_links.is_empty() {
        content["slack_links"] = slack_links.into();
    }

    let files: Vec<_> = message
        .files
        .iter()
        .filter(|file| is_plain_text_file(&file.filetype) || is_pdf_file(&file.filetype))
        .map(|file| json!({"title": file.title, "permalink": file.permalink}))
        .collect();
    if !files.is_empty() {
        content["files"] = files.into();
    }

    Ok(pretty_json(&content))
}

fn truncate_nested(budgeter: &TextBudgeter, text: Option<&str>) -> Result<String, AgentError> {
    Ok(budgeter.truncate(text.unwrap_or_default(), Some(NESTED_FIELD_TOKEN_BUDGET))?)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::llm::fake::FakeChatModel;

    #[derive(Default)]
    struct ScriptedTools {
        pub conversation_answer: String,
        pub url_answer: String,
        pub queries: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RetrievalTools for ScriptedTools {
        async fn conversation_search(&self, question: &str) -> Result<String, AgentError> {
            self.queries.lock().unwrap().push(("conversation".into(), question.into()));
            Ok(self.conversation_answer.clone())
        }

        async fn url_search(&self, url: &str) -> Result<String, AgentError> {
            self.queries.lock().unwrap().push(("url".into(), url.into()));
            Ok(self.url_answer.clone())
        }
    }

    fn budgeter() -> TextBudgeter {
        TextBudgeter::new("gpt-3.5-turbo").unwrap()
    }

    fn settings() -> ChainSettings {
        ChainSettings {
            bot_id: "B1".into(),
            channel_id: "C1".into(),
            model: "gpt-3.5-turbo".into(),
            temperature: 1.0,
            context: "Answer briefly.".into(),
            timezone_offset: "+00:00".into(),
        }
    }

    fn chain(model: Arc<FakeChatModel>, tools: Arc<ScriptedTools>) -> ChatChain {
        ChatChain::new(
            model,
            tools,
            budgeter(),
            ConversationMemory::new(budgeter()),
            settings(),
        )
    }

    fn mention(text: &str) -> MessagePayload {
        MessagePayload {
            user: "U1".into(),
            text: text.into(),
            ts: "1629470261.000200".into(),
            ..MessagePayload::default()
        }
    }

    #[tokio::test]
    async fn final_answer_goes_straight_through() {
        let model = Arc::new(FakeChatModel::answering("Hi there."));
        let mut chain = chain(model.clone(), Arc::new(ScriptedTools::default()));

        let answer = chain.run(&mention("<@B1> hello")).await.unwrap();
        assert_eq!(answer, "Hi there.");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0][0].content.contains("bot with ID B1"));
        assert!(requests[0][0].content.contains("Answer briefly."));
        assert!(requests[0].last().unwrap().content.contains("Human: "));
    }

    #[tokio::test]
    async fn tool_round_feeds_the_observation_back() {
        let model = Arc::new(FakeChatModel::with_responses(vec![
            Ok(format!(
                "```json\n{{\"action\": \"{SLACK_CONVERSATION_SEARCH_NAME}\", \
                 \"action_input\": \"what broke?\"}}\n```"
            )),
            Ok(format!(
                "```json\n{{\"action\": \"{FINAL_ANSWER_ACTION}\", \
                 \"action_input\": \"The deploy broke.\"}}\n```"
            )),
        ]));
        let tools = Arc::new(ScriptedTools {
            conversation_answer: "deploy failure last friday".into(),
            ..ScriptedTools::default()
        });
        let mut chain = chain(model.clone(), tools.clone());

        let answer = chain.run(&mention("<@B1> what broke?")).await.unwrap();
        assert_eq!(answer, "The deploy broke.");
        assert_eq!(
            tools.queries.lock().unwrap().clone(),
            vec![("conversation".to_string(), "what broke?".to_string())]
        );

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1]
            .iter()
            .any(|m| m.content.contains("deploy failure last friday")));
    }

    #[tokio::test]
    async fn freeform_response_is_taken_as_the_answer() {
        let model =
            Arc::new(FakeChatModel::with_responses(vec![Ok("Plain prose answer.".into())]));
        let mut chain = chain(model, Arc::new(ScriptedTools::default()));
        let answer = chain.run(&mention("hello")).await.unwrap();
        assert_eq!(answer, "Plain prose answer.");
    }

    #[tokio::test]
    async fn replayed_history_sits_between_system_and_input() {
        let model = Arc::new(FakeChatModel::answering("ok"));
        let mut chain = chain(model.clone(), Arc::new(ScriptedTools::default()));
        chain.add_user_message(&mention("earlier question")).unwrap();
        chain.add_bot_message(&mention("earlier answer")).unwrap();

        chain.run(&mention("follow-up")).await.unwrap();
        let request = &model.requests()[0];
        assert_eq!(request.len(), 4);
        assert!(request[1].content.contains("earlier question"));
        assert!(request[2].content.contains("earlier answer"));
    }

    #[test]
    fn utc_and_local_time_messages_differ() {
        let now = Utc.with_ymd_and_hms(2021, 8, 20, 14, 37, 41).unwrap();
        assert_eq!(
            time_message_at(now, "+00:00"),
            "Current time is '2021-08-20T14:37:41+00:00'. "
        );
        assert_eq!(
            time_message_at(now, "+09:00"),
            "Current local time is '2021-08-20T23:37:41+09:00'. \
             Respect local timezone by default. "
        );
    }

    #[test]
    fn formatted_message_localizes_the_timestamp() {
        let formatted =
            format_message(&budgeter(), "+09:00", &mention("Hello, World!"), true).unwrap();
        let value: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["action"], "Message");
        assert_eq!(value["action_input"], "Hello, World!");
        assert_eq!(value["user_id"], "U1");
        assert_eq!(value["timestamp"], "2021-08-20T23:37:41+09:00");
    }

    #[test]
    fn formatted_message_omits_timestamp_for_the_live_input() {
        let formatted =
            format_message(&budgeter(), "+00:00", &mention("hi"), false).unwrap();
        let value: Value = serde_json::from_str(&formatted).unwrap();
        assert!(value.get("timestamp").is_none());
    }

    #[test]
    fn action_blob_parses_with_and_without_fences() {
        let fenced = "```json\n{\"action\": \"Final Answer\", \"action_input\": \"done\"}\n```";
        assert_eq!(
            parse_action(fenced),
            Some(("Final Answer".into(), "done".into()))
        );
        let bare = "{\"action\": \"Slack URL Search\", \"action_input\": \"https://x\"}";
        assert_eq!(
            parse_action(bare),
            Some(("Slack URL Search".into(), "https://x".into()))
        );
        assert_eq!(parse_action("no blob here"), None);
    }
}
