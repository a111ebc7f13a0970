use chrono::Utc;
use serde_json::json;

use hindsight_core::document::{pretty_json, Document, DocumentMetadata};

const PLACEHOLDER_ID: &str = "PLACEHOLDER";
const PLACEHOLDER_MESSAGE: &str = "Do not use this document to answer questions.";

/// The document every fresh index starts with.
///
/// Similarity search against an empty collection has nothing to rank; the
/// placeholder guarantees one object exists. Its `channel_id` and
/// `thread_ts` never collide with real metadata, so query filters can still
/// match it; the content tells the model to ignore it.
pub fn placeholder_document() -> Document {
    let timestamp = Utc::now();
    let ts = format!("{}.{:06}", timestamp.timestamp(), timestamp.timestamp_subsec_micros());

    let metadata = DocumentMetadata {
        file_or_attachment_id: PLACEHOLDER_ID.into(),
        content_type: "message".into(),
        channel_type: "channel".into(),
        channel_id: PLACEHOLDER_ID.into(),
        thread_ts: ts.clone(),
        ts,
        permalink: format!("https://slack.com/archives/{PLACEHOLDER_ID}/p0"),
        timestamp,
    };

    Document {
        content: pretty_json(&json!({
            "content_type": "message",
            "user": PLACEHOLDER_ID,
            "channel": PLACEHOLDER_ID,
            "message": PLACEHOLDER_MESSAGE,
            "permalink": metadata.permalink,
            "timestamp": timestamp.to_rfc3339(),
        })),
        metadata,
    }
}
