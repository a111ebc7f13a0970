//! Typed Slack event callbacks.
//!
//! The raw callback JSON is parsed once, here, into an [`EventCallback`];
//! handlers never see raw maps. Unknown event types and message subtypes
//! are kept as `Unsupported` so the dispatcher can log and drop them.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use hindsight_core::payload::MessagePayload;

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("event callback is missing `{0}`")]
    MissingField(&'static str),
    #[error("could not decode event payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// One event callback, with the workspace routing fields pulled up.
#[derive(Clone, Debug, PartialEq)]
pub struct EventCallback {
    pub team_id: String,
    /// The bot user installed in this workspace.
    pub bot_id: String,
    /// Epoch seconds the event was delivered at.
    pub event_time: i64,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SlackEvent {
    Message(MessageEvent),
    AppMention(AppMentionEvent),
    FileShared(FileSharedEvent),
    FileDeleted { file_id: String },
    ChannelDeleted { channel_id: String },
    AppUninstalled,
    Unsupported { event_type: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    AppMention,
    FileShared,
    FileDeleted,
    ChannelDeleted,
    AppUninstalled,
    Unsupported,
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::FileShared(_) => SlackEventType::FileShared,
            Self::FileDeleted { .. } => SlackEventType::FileDeleted,
            Self::ChannelDeleted { .. } => SlackEventType::ChannelDeleted,
            Self::AppUninstalled => SlackEventType::AppUninstalled,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub channel_type: String,
    pub change: MessageChange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageChange {
    /// A new message, including `file_share` messages.
    Created { message: MessagePayload },
    Changed { message: MessagePayload, previous: MessagePayload },
    Deleted { previous_ts: String },
    ChannelTopic,
    ChannelPurpose,
    Unsupported { subtype: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppMentionEvent {
    pub channel_id: String,
    pub message: MessagePayload,
    /// Edited mentions are skipped; the original was already answered.
    pub edited: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileSharedEvent {
    pub file_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub event_ts: String,
}

#[derive(Debug, Deserialize)]
struct WireCallback {
    team_id: String,
    event_time: i64,
    #[serde(default)]
    authorizations: Vec<WireAuthorization>,
    event: Value,
}

#[derive(Debug, Deserialize)]
struct WireAuthorization {
    user_id: String,
}

impl EventCallback {
    pub fn parse(body: &Value) -> Result<Self, EventParseError> {
        let wire: WireCallback = serde_json::from_value(body.clone())?;
        let bot_id = wire
            .authorizations
            .first()
            .map(|auth| auth.user_id.clone())
            .ok_or(EventParseError::MissingField("authorizations"))?;
        let event = parse_event(&wire.event)?;
        Ok(Self { team_id: wire.team_id, bot_id, event_time: wire.event_time, event })
    }
}

fn parse_event(event: &Value) -> Result<SlackEvent, EventParseError> {
    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EventParseError::MissingField("event.type"))?;

    match event_type {
        "message" => parse_message_event(event).map(SlackEvent::Message),
        "app_mention" => Ok(SlackEvent::AppMention(AppMentionEvent {
            channel_id: required_str(event, "channel")?,
            message: serde_json::from_value(event.clone())?,
            edited: event.get("edited").is_some(),
        })),
        "file_shared" => Ok(SlackEvent::FileShared(FileSharedEvent {
            file_id: required_str(event, "file_id")?,
            channel_id: required_str(event, "channel_id")?,
            user_id: required_str(event, "user_id")?,
            event_ts: required_str(event, "event_ts")?,
        })),
        "file_deleted" => {
            Ok(SlackEvent::FileDeleted { file_id: required_str(event, "file_id")? })
        }
        "channel_deleted" | "group_deleted" => {
            Ok(SlackEvent::ChannelDeleted { channel_id: required_str(event, "channel")? })
        }
        "app_uninstalled" => Ok(SlackEvent::AppUninstalled),
        other => Ok(SlackEvent::Unsupported { event_type: other.to_string() }),
    }
}

fn parse_message_event(event: &Value) -> Result<MessageEvent, EventParseError> {
    let channel_id = required_str(event, "channel")?;
    let channel_type =
        event.get("channel_type").and_then(Value::as_str).unwrap_or_default().to_string();
    let subtype = event.get("subtype").and_then(Value::as_str);

    let change = match subtype {
        None | Some("file_share") => {
            MessageChange::Created { message: serde_json::from_value(event.clone())? }
        }
        Some("message_changed") => MessageChange::Changed {
            message: serde_json::from_value(
                event.get("message").cloned().ok_or(EventParseError::MissingField("message"))?,
            )?,
            previous: serde_json::from_value(
                event
                    .get("previous_message")
                    .cloned()
                    .ok_or(EventParseError::MissingField("previous_message"))?,
            )?,
        },
        Some("message_deleted") => MessageChange::Deleted {
            previous_ts: event
                .get("previous_message")
                .and_then(|message| message.get("ts"))
                .and_then(Value::as_str)
                .ok_or(EventParseError::MissingField("previous_message.ts"))?
                .to_string(),
        },
        Some("channel_topic") => MessageChange::ChannelTopic,
        Some("channel_purpose") => MessageChange::ChannelPurpose,
        Some(other) => MessageChange::Unsupported { subtype: other.to_string() },
    };

    Ok(MessageEvent { channel_id, channel_type, change })
}

fn required_str(event: &Value, field: &'static str) -> Result<String, EventParseError> {
    event
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(EventParseError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn callback(event: Value) -> Value {
        json!({
            "team_id": "T1",
            "event_time": 1_629_470_261,
            "authorizations": [{"user_id": "B1"}],
            "event": event,
        })
    }

    #[test]
    fn parses_plain_message() {
        let parsed = EventCallback::parse(&callback(json!({
            "type": "message",
            "channel": "C1",
            "channel_type": "channel",
            "user": "U1",
            "text": "Hello, World!",
            "ts": "1629470261.000200",
        })))
        .unwrap();

        assert_eq!(parsed.team_id, "T1");
        assert_eq!(parsed.bot_id, "B1");
        let SlackEvent::Message(message) = parsed.event else { panic!("not a message") };
        assert_eq!(message.channel_id, "C1");
        let MessageChange::Created { message } = message.change else { panic!("not created") };
        assert_eq!(message.text, "Hello, World!");
        assert_eq!(message.ts, "1629470261.000200");
    }

    #[test]
    fn parses_message_changed_with_previous() {
        let parsed = EventCallback::parse(&callback(json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "C1",
            "channel_type": "channel",
            "message": {"user": "U1", "text": "new", "ts": "1.0"},
            "previous_message": {"user": "U1", "text": "old", "ts": "1.0"},
        })))
        .unwrap();

        let SlackEvent::Message(message) = parsed.event else { panic!() };
        let MessageChange::Changed { message, previous } = message.change else { panic!() };
        assert_eq!(message.text, "new");
        assert_eq!(previous.text, "old");
    }

    #[test]
    fn parses_message_deleted() {
        let parsed = EventCallback::parse(&callback(json!({
            "type": "message",
            "subtype": "message_deleted",
            "channel": "C1",
            "previous_message": {"user": "U1", "text": "gone", "ts": "1.0"},
        })))
        .unwrap();

        let SlackEvent::Message(message) = parsed.event else { panic!() };
        assert_eq!(message.change, MessageChange::Deleted { previous_ts: "1.0".into() });
    }

    #[test]
    fn unknown_subtype_is_kept_not_dropped() {
        let parsed = EventCallback::parse(&callback(json!({
            "type": "message",
            "subtype": "bot_message",
            "channel": "C1",
            "ts": "1.0",
        })))
        .unwrap();

        let SlackEvent::Message(message) = parsed.event else { panic!() };
        assert_eq!(
            message.change,
            MessageChange::Unsupported { subtype: "bot_message".into() }
        );
    }

    #[test]
    fn parses_mention_and_marks_edits() {
        let parsed = EventCallback::parse(&callback(json!({
            "type": "app_mention",
            "channel": "C1",
            "user": "U1",
            "text": "<@B1> what changed?",
            "ts": "2.0",
            "edited": {"user": "U1", "ts": "3.0"},
        })))
        .unwrap();

        let SlackEvent::AppMention(mention) = parsed.event else { panic!() };
        assert!(mention.edited);
        assert_eq!(mention.channel_id, "C1");
    }

    #[test]
    fn parses_file_and_channel_lifecycle_events() {
        let shared = EventCallback::parse(&callback(json!({
            "type": "file_shared",
            "file_id": "F1",
            "channel_id": "C1",
            "user_id": "U1",
            "event_ts": "4.0",
        })))
        .unwrap();
        assert!(matches!(shared.event, SlackEvent::FileShared(ref e) if e.file_id == "F1"));

        let deleted = EventCallback::parse(&callback(json!({
            "type": "file_deleted",
            "file_id": "F1",
        })))
        .unwrap();
        assert_eq!(deleted.event, SlackEvent::FileDeleted { file_id: "F1".into() });

        let group = EventCallback::parse(&callback(json!({
            "type": "group_deleted",
            "channel": "G1",
        })))
        .unwrap();
        assert_eq!(group.event, SlackEvent::ChannelDeleted { channel_id: "G1".into() });

        let uninstalled =
            EventCallback::parse(&callback(json!({"type": "app_uninstalled"}))).unwrap();
        assert_eq!(uninstalled.event, SlackEvent::AppUninstalled);
    }

    #[test]
    fn unknown_event_type_is_unsupported() {
        let parsed =
            EventCallback::parse(&callback(json!({"type": "reaction_added"}))).unwrap();
        assert_eq!(
            parsed.event,
            SlackEvent::Unsupported { event_type: "reaction_added".into() }
        );
    }

    #[test]
    fn missing_authorizations_is_an_error() {
        let err = EventCallback::parse(&json!({
            "team_id": "T1",
            "event_time": 1,
            "event": {"type": "app_uninstalled"},
        }))
        .unwrap_err();
        assert!(matches!(err, EventParseError::MissingField("authorizations")));
    }
}
