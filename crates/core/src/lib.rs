//! Domain logic for hindsight: turning Slack workspace content into
//! indexable documents and back into retrieval scopes, plus the
//! per-workspace and application configuration that governs it.
//!
//! Everything here is pure and synchronous; IO lives in the db, index,
//! slack, and agent crates.

pub mod budget;
pub mod channel_info;
pub mod classify;
pub mod config;
pub mod diff;
pub mod document;
pub mod normalize;
pub mod payload;
pub mod scope;
pub mod team;

pub use budget::{BudgetError, TextBudgeter};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use document::{Document, DocumentMetadata, TimestampError, FILE_DOCUMENT_THREAD_TS};
pub use team::{ConfigValidationError, SlackTeam, TeamSettingsPatch};
