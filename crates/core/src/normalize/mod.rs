//! Normalizers turn typed Slack payloads into indexable [`Document`]s.
//!
//! Each normalizer is deterministic: the same payload and context always
//! produce the same documents, byte for byte. All of them convert the event
//! epoch time up front and fail fast on an unusable value.
//!
//! [`Document`]: crate::document::Document

mod file;
mod link;
mod message;

pub use file::{pdf_documents, plain_text_documents};
pub use link::{slack_link_document, unfurling_link_document};
pub use message::message_document;

use thiserror::Error;

use crate::budget::BudgetError;
use crate::document::TimestampError;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("could not extract pdf text: {0}")]
    Pdf(String),
}
