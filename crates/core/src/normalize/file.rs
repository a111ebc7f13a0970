use serde_json::json;

use crate::budget::TextBudgeter;
use crate::classify::{is_pdf_file, is_plain_text_file};
use crate::document::{
    pretty_json, timestamp_from_epoch, Document, DocumentMetadata, FILE_DOCUMENT_THREAD_TS,
};
use crate::payload::{FilePayload, FileShareContext};

use super::NormalizeError;

/// Builds one document per token-budget page of a plain-text file.
///
/// Files outside the plain-text allow-list produce no documents. All pages
/// share the same metadata; the page position only appears in the content.
pub fn plain_text_documents(
    budgeter: &TextBudgeter,
    ctx: &FileShareContext,
    file: &FilePayload,
    content: &str,
) -> Result<Vec<Document>, NormalizeError> {
    if !is_plain_text_file(&file.filetype) {
        return Ok(Vec::new());
    }
    paged_documents(budgeter, ctx, file, content)
}

/// Builds one document per token-budget page of a PDF file.
///
/// The caller downloads the bytes (they are dropped when this returns);
/// extraction failures are not fatal to the surrounding ingestion but
/// surface as an error for this file.
pub fn pdf_documents(
    budgeter: &TextBudgeter,
    ctx: &FileShareContext,
    file: &FilePayload,
    bytes: &[u8],
) -> Result<Vec<Document>, NormalizeError> {
    if !is_pdf_file(&file.filetype) {
        return Ok(Vec::new());
    }
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| NormalizeError::Pdf(err.to_string()))?;
    paged_documents(budgeter, ctx, file, &text)
}

fn paged_documents(
    budgeter: &TextBudgeter,
    ctx: &FileShareContext,
    file: &FilePayload,
    content: &str,
) -> Result<Vec<Document>, NormalizeError> {
    let timestamp = timestamp_from_epoch(ctx.event_time)?;

    let metadata = DocumentMetadata {
        file_or_attachment_id: file.id.clone(),
        content_type: file.filetype.clone(),
        channel_type: ctx.channel_type.clone(),
        channel_id: ctx.channel_id.clone(),
        thread_ts: FILE_DOCUMENT_THREAD_TS.into(),
        ts: ctx.event_ts.clone(),
        permalink: file.permalink.clone(),
        timestamp,
    };

    let pages = budgeter.split(content)?;
    let page_count = pages.len();

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| Document {
            content: pretty_json(&json!({
                "content_type": file.filetype,
                "user": ctx.user_id,
                "name": file.name,
                "title": file.title,
                "channel": ctx.channel_id,
                "content": page,
                "page": format!("{} / {}", i + 1, page_count),
                "permalink": file.permalink,
                "timestamp": timestamp.to_rfc3339(),
            })),
            metadata: metadata.clone(),
        })
        .collect())
}
