use async_trait::async_trait;
use thiserror::Error;

use hindsight_core::team::{ConfigValidationError, SlackTeam, TeamSettingsPatch};

pub mod memory;
pub mod team;

pub use memory::InMemoryTeamRepository;
pub use team::SqlTeamRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("team not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}

/// Storage for per-workspace configuration.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Fetches a team, failing with [`RepositoryError::NotFound`] when the
    /// workspace has no row yet.
    async fn get(&self, team_id: &str) -> Result<SlackTeam, RepositoryError>;

    /// Fetches a team, inserting a defaulted row on first sight. Never
    /// returns `NotFound`.
    async fn get_or_create(&self, team_id: &str, bot_id: &str)
        -> Result<SlackTeam, RepositoryError>;

    /// Applies a validated settings patch in a single transaction.
    async fn update(
        &self,
        team_id: &str,
        patch: &TeamSettingsPatch,
    ) -> Result<SlackTeam, RepositoryError>;

    /// Removes a workspace's configuration. Idempotent.
    async fn delete(&self, team_id: &str) -> Result<(), RepositoryError>;
}
