use serde_json::json;

use crate::budget::TextBudgeter;
use crate::classify::{is_pdf_file, is_plain_text_file, is_slack_link, is_unfurling_link};
use crate::document::{
    pretty_json, timestamp_from_epoch, Document, DocumentMetadata, FILE_DOCUMENT_THREAD_TS,
};
use crate::payload::{AttachmentPayload, MessageContext, MessagePayload};

use super::NormalizeError;

/// Builds the document for a shared-message attachment, if it qualifies.
pub fn slack_link_document(
    budgeter: &TextBudgeter,
    ctx: &MessageContext,
    message: &MessagePayload,
    attachment: &AttachmentPayload,
) -> Result<Option<Document>, NormalizeError> {
    if !is_slack_link(attachment) {
        return Ok(None);
    }
    let original_url = attachment.original_url.clone().unwrap_or_default();
    let metadata = link_metadata(ctx, message, attachment, "slack_link", &original_url)?;

    let mut content = json!({
        "content_type": "slack_link",
        "user": message.user,
        "author": attachment.author_id,
        "channel": ctx.channel_id,
        "content": budgeter.truncate(attachment.text.as_deref().unwrap_or_default(), None)?,
        "permalink": original_url,
        "timestamp": metadata.timestamp.to_rfc3339(),
    });

    let files: Vec<_> = attachment
        .files
        .iter()
        .filter(|file| is_plain_text_file(&file.filetype) || is_pdf_file(&file.filetype))
        .map(|file| json!({"title": file.title, "permalink": file.permalink}))
        .collect();
    if !files.is_empty() {
        content["files"] = files.into();
    }

    Ok(Some(Document {
        content: pretty_json(&content),
        metadata,
    }))
}

/// Builds the document for an external link preview, if it qualifies.
pub fn unfurling_link_document(
    budgeter: &TextBudgeter,
    ctx: &MessageContext,
    message: &MessagePayload,
    attachment: &AttachmentPayload,
) -> Result<Option<Document>, NormalizeError> {
    if !is_unfurling_link(attachment) {
        return Ok(None);
    }
    let original_url = attachment.original_url.clone().unwrap_or_default();
    let metadata = link_metadata(ctx, message, attachment, "unfurling_link", &original_url)?;

    let mut content = json!({
        "content_type": "unfurling_link",
        "user": message.user,
        "title": attachment.title,
        "channel": ctx.channel_id,
        "content": budgeter.truncate(attachment.text.as_deref().unwrap_or_default(), None)?,
        "permalink": original_url,
        "timestamp": metadata.timestamp.to_rfc3339(),
    });
    if let Some(service_name) = attachment
        .service_name
        .as_deref()
        .filter(|name| !name.is_empty())
    {
        content["service_name"] = service_name.into();
    }

    Ok(Some(Document {
        content: pretty_json(&content),
        metadata,
    }))
}

fn link_metadata(
    ctx: &MessageContext,
    message: &MessagePayload,
    attachment: &AttachmentPayload,
    content_type: &str,
    original_url: &str,
) -> Result<DocumentMetadata, NormalizeError> {
    let timestamp = timestamp_from_epoch(ctx.event_time)?;
    Ok(DocumentMetadata {
        file_or_attachment_id: format!(
            "{}-{}",
            message.ts,
            attachment.id.unwrap_or_default()
        ),
        content_type: content_type.into(),
        channel_type: ctx.channel_type.clone(),
        channel_id: ctx.channel_id.clone(),
        thread_ts: FILE_DOCUMENT_THREAD_TS.into(),
        ts: message.ts.clone(),
        permalink: original_url.to_string(),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::FilePayload;

    fn budgeter() -> TextBudgeter {
        TextBudgeter::new("gpt-3.5-turbo").unwrap()
    }

    fn ctx() -> MessageContext {
        MessageContext {
            team_id: "T1".into(),
            channel_id: "C1".into(),
            channel_type: "group".into(),
            event_time: 1_629_470_261,
        }
    }

    fn message() -> MessagePayload {
        MessagePayload {
            user: "U1".into(),
            text: "sharing".into(),
            ts: "1629470261.000200".into(),
            ..MessagePayload::default()
        }
    }

    #[test]
    fn slack_link_gets_composite_id_and_sentinel_thread() {
        let attachment = AttachmentPayload {
            id: Some(2),
            original_url: Some("https://example.slack.com/archives/C2/p1".into()),
            author_id: Some("U9".into()),
            text: Some("quoted message".into()),
            files: vec![FilePayload {
                id: "F1".into(),
                filetype: "markdown".into(),
                title: "README".into(),
                permalink: "https://files/F1".into(),
                ..FilePayload::default()
            }],
            ..AttachmentPayload::default()
        };
        let doc = slack_link_document(&budgeter(), &ctx(), &message(), &attachment)
            .unwrap()
            .unwrap();

        assert_eq!(doc.metadata.file_or_attachment_id, "1629470261.000200-2");
        assert_eq!(doc.metadata.thread_ts, FILE_DOCUMENT_THREAD_TS);
        assert_eq!(doc.metadata.content_type, "slack_link");
        assert_eq!(doc.metadata.ts, "1629470261.000200");

        let content: serde_json::Value = serde_json::from_str(&doc.content).unwrap();
        assert_eq!(content["author"], "U9");
        assert_eq!(content["files"][0]["title"], "README");
    }

    #[test]
    fn unqualified_attachment_yields_none() {
        let attachment = AttachmentPayload {
            id: Some(2),
            text: Some("no url".into()),
            ..AttachmentPayload::default()
        };
        assert!(slack_link_document(&budgeter(), &ctx(), &message(), &attachment)
            .unwrap()
            .is_none());
        assert!(
            unfurling_link_document(&budgeter(), &ctx(), &message(), &attachment)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unfurling_link_includes_service_name_when_present() {
        let mut attachment = AttachmentPayload {
            id: Some(1),
            original_url: Some("https://example.com/post".into()),
            title: Some("A post".into()),
            text: Some("preview".into()),
            ..AttachmentPayload::default()
        };
        let doc = unfurling_link_document(&budgeter(), &ctx(), &message(), &attachment)
            .unwrap()
            .unwrap();
        let content: serde_json::Value = serde_json::from_str(&doc.content).unwrap();
        assert!(content.get("service_name").is_none());
        assert_eq!(content["title"], "A post");

        attachment.service_name = Some("Example Blog".into());
        let doc = unfurling_link_document(&budgeter(), &ctx(), &message(), &attachment)
            .unwrap()
            .unwrap();
        let content: serde_json::Value = serde_json::from_str(&doc.content).unwrap();
        assert_eq!(content["service_name"], "Example Blog");
    }

    #[test]
    fn dual_qualifying_attachment_builds_both_documents() {
        let attachment = AttachmentPayload {
            id: Some(1),
            original_url: Some("https://example.slack.com/archives/C2/p1".into()),
            author_id: Some("U9".into()),
            title: Some("also titled".into()),
            text: Some("body".into()),
            ..AttachmentPayload::default()
        };
        let slack = slack_link_document(&budgeter(), &ctx(), &message(), &attachment).unwrap();
        let unfurl = unfurling_link_document(&budgeter(), &ctx(), &message(), &attachment).unwrap();
        assert!(slack.is_some());
        assert!(unfurl.is_some());
        assert_ne!(
            slack.unwrap().metadata.content_type,
            unfurl.unwrap().metadata.content_type
        );
    }
}
