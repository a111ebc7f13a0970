//! Indexed document model.
//!
//! Every piece of workspace content (a message, a file page, a link preview)
//! is flattened into a [`Document`]: a pretty-printed JSON `content` string
//! plus a fixed set of metadata fields the retrieval filters operate on.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Sentinel `thread_ts` carried by every file and attachment document.
///
/// Retrieval excludes the current thread by `thread_ts`, and file content
/// must stay retrievable from the thread it was shared in. No real Slack
/// timestamp ever takes this value.
pub const FILE_DOCUMENT_THREAD_TS: &str = "0000000000.000000";

/// A unit of indexed content.
///
/// Equality is structural over content and metadata; the differ relies on it
/// to compute added/removed sets across message edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// The closed metadata attribute set stored alongside each document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub file_or_attachment_id: String,
    pub content_type: String,
    pub channel_type: String,
    pub channel_id: String,
    pub thread_ts: String,
    pub ts: String,
    pub permalink: String,
    pub timestamp: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Metadata as index properties, with the timestamp in RFC 3339.
    pub fn to_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "file_or_attachment_id".into(),
            self.file_or_attachment_id.clone().into(),
        );
        properties.insert("content_type".into(), self.content_type.clone().into());
        properties.insert("channel_type".into(), self.channel_type.clone().into());
        properties.insert("channel_id".into(), self.channel_id.clone().into());
        properties.insert("thread_ts".into(), self.thread_ts.clone().into());
        properties.insert("ts".into(), self.ts.clone().into());
        properties.insert("permalink".into(), self.permalink.clone().into());
        properties.insert("timestamp".into(), self.timestamp.to_rfc3339().into());
        properties
    }
}

/// Raised when an event carries an epoch time chrono cannot represent.
///
/// Events with unusable timestamps are dropped at the handler boundary
/// rather than indexed with a fabricated time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not convert epoch seconds {0} to a timestamp")]
pub struct TimestampError(pub i64);

/// Fail-fast conversion from Slack `event_time` to a UTC timestamp.
pub fn timestamp_from_epoch(event_time: i64) -> Result<DateTime<Utc>, TimestampError> {
    Utc.timestamp_opt(event_time, 0)
        .single()
        .ok_or(TimestampError(event_time))
}

/// Serializes a JSON value with four-space indentation, non-ASCII preserved.
///
/// Document content strings are built through this so that the indexed text
/// is stable across releases.
pub fn pretty_json(value: &serde_json::Value) -> String {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .expect("serializing a json value cannot fail");
    String::from_utf8(out).expect("serde_json emits utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epoch_converts_to_rfc3339_utc() {
        let ts = timestamp_from_epoch(1_629_470_261).unwrap();
        assert_eq!(ts.to_rfc3339(), "2021-08-20T14:37:41+00:00");
    }

    #[test]
    fn epoch_out_of_range_fails() {
        let err = timestamp_from_epoch(i64::MAX).unwrap_err();
        assert_eq!(err, TimestampError(i64::MAX));
    }

    #[test]
    fn pretty_json_uses_four_space_indent() {
        let rendered = pretty_json(&json!({"message": "こんにちは"}));
        assert_eq!(rendered, "{\n    \"message\": \"こんにちは\"\n}");
    }

    #[test]
    fn metadata_properties_carry_rfc3339_timestamp() {
        let metadata = DocumentMetadata {
            file_or_attachment_id: String::new(),
            content_type: "message".into(),
            channel_type: "channel".into(),
            channel_id: "C1".into(),
            thread_ts: "1629470261.000200".into(),
            ts: "1629470261.000200".into(),
            permalink: "https://example.slack.com/p1".into(),
            timestamp: timestamp_from_epoch(1_629_470_261).unwrap(),
        };
        let properties = metadata.to_properties();
        assert_eq!(properties["timestamp"], "2021-08-20T14:37:41+00:00");
        assert_eq!(properties.len(), 8);
    }
}
