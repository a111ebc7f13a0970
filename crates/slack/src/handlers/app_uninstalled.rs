use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use hindsight_db::repositories::TeamRepository;
use hindsight_db::RepositoryError;
use hindsight_index::{IndexGateway, VectorIndexEngine};

use crate::dispatch::{EventHandler, EventHandlerError};
use crate::events::{EventCallback, SlackEvent, SlackEventType};

/// Drops a workspace's index and stored configuration on uninstall.
pub struct AppUninstalledHandler {
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
}

impl AppUninstalledHandler {
    pub fn new(teams: Arc<dyn TeamRepository>, engine: Arc<dyn VectorIndexEngine>) -> Self {
        Self { teams, engine }
    }
}

#[async_trait]
impl EventHandler for AppUninstalledHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppUninstalled
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        if !matches!(callback.event, SlackEvent::AppUninstalled) {
            return Ok(());
        }

        // The namespace only matters for writes; uninstall may run against
        // a workspace that never stored a row.
        let namespace = match self.teams.get(&callback.team_id).await {
            Ok(team) => team.namespace_uuid,
            Err(RepositoryError::NotFound(_)) => Uuid::nil(),
            Err(error) => return Err(error.into()),
        };

        let gateway = IndexGateway::new(self.engine.clone(), &callback.team_id, namespace);
        gateway.delete_index().await?;
        self.teams.delete(&callback.team_id).await?;
        info!(team_id = %callback.team_id, "removed uninstalled workspace");
        Ok(())
    }
}
