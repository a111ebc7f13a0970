//! Typed Slack event payloads.
//!
//! Handlers deserialize the interesting part of each event callback into
//! these structs once, at the boundary; everything downstream works with
//! typed fields instead of raw JSON maps.

use serde::Deserialize;

/// A message body as delivered inside `message` and `app_mention` events.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

impl MessagePayload {
    /// The thread this message belongs to; a top-level message roots its own.
    pub fn thread_or_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// A link unfurl or message share attached to a message.
///
/// Slack numbers attachments per message starting at 1; the composite
/// document id `{message_ts}-{attachment_id}` relies on that.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

/// A file object as carried in message bodies and `files.info` responses.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FilePayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filetype: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url_private: String,
}

/// Channel scope shared by every document built from a message event.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageContext {
    pub team_id: String,
    pub channel_id: String,
    pub channel_type: String,
    /// Epoch seconds the event was delivered at.
    pub event_time: i64,
}

/// Scope for documents built from a shared file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileShareContext {
    pub team_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub channel_type: String,
    /// Event timestamp string; becomes the `ts` of every file document.
    pub event_ts: String,
    pub event_time: i64,
}
