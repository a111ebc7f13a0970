use serde_json::json;

use crate::budget::{TextBudgeter, NESTED_FIELD_TOKEN_BUDGET};
use crate::classify::{is_pdf_file, is_plain_text_file, is_slack_link, is_unfurling_link};
use crate::document::{pretty_json, timestamp_from_epoch, Document, DocumentMetadata};
use crate::payload::{MessageContext, MessagePayload};

use super::NormalizeError;

/// Builds the single document that represents a message.
///
/// The message text is truncated to the model budget; qualifying
/// attachments and files are embedded as summary arrays so the message
/// document is searchable by what it linked to. `permalink` is resolved by
/// the caller over the Slack API.
pub fn message_document(
    budgeter: &TextBudgeter,
    ctx: &MessageContext,
    message: &MessagePayload,
    permalink: &str,
) -> Result<Document, NormalizeError> {
    let timestamp = timestamp_from_epoch(ctx.event_time)?;

    let metadata = DocumentMetadata {
        file_or_attachment_id: String::new(),
        content_type: "message".into(),
        channel_type: ctx.channel_type.clone(),
        channel_id: ctx.channel_id.clone(),
        thread_ts: message.thread_or_ts().to_string(),
        ts: message.ts.clone(),
        permalink: permalink.to_string(),
        timestamp,
    };

    let mut content = json!({
        "content_type": "message",
        "user": message.user,
        "channel": ctx.channel_id,
        "message": budgeter.truncate(&message.text, None)?,
        "permalink": permalink,
        "timestamp": timestamp.to_rfc3339(),
    });

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
        .collect::<Result<Vec<_>, NormalizeError>>()?;
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
        .collect::<Result<Vec<_>, NormalizeError>>()?;
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

    Ok(Document {
        content: pretty_json(&content),
        metadata,
    })
}

fn truncate_nested(
    budgeter: &TextBudgeter,
    text: Option<&str>,
) -> Result<String, NormalizeError> {
    Ok(budgeter.truncate(text.unwrap_or_default(), Some(NESTED_FIELD_TOKEN_BUDGET))?)
}
