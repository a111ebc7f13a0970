use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use hindsight_core::budget::BudgetError;
use hindsight_core::normalize::NormalizeError;
use hindsight_db::RepositoryError;
use hindsight_index::IndexError;

use crate::client::SlackApiError;
use crate::events::{EventCallback, SlackEventType};
use crate::tasks::TaskGroup;

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Slack(#[from] SlackApiError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Budget(#[from] BudgetError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError>;
}

/// Routes callbacks to their handler on a background task.
///
/// Slack retries any callback that is not acknowledged within three
/// seconds, so `dispatch` returns as soon as the work is spawned. Handler
/// failures are logged and dropped; one bad event must never take the
/// event loop down with it.
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
    tasks: Arc<TaskGroup>,
}

impl EventDispatcher {
    pub fn new(tasks: Arc<TaskGroup>) -> Self {
        Self { handlers: HashMap::new(), tasks }
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub async fn dispatch(&self, callback: EventCallback) {
        let event_type = callback.event.event_type();
        let Some(handler) = self.handlers.get(&event_type) else {
            debug!(?event_type, team_id = %callback.team_id, "no handler registered");
            return;
        };

        let handler = handler.clone();
        self.tasks
            .spawn(async move {
                if let Err(error) = handler.handle(&callback).await {
                    warn!(
                        ?event_type,
                        team_id = %callback.team_id,
                        %error,
                        "event handler failed"
                    );
                }
            })
            .await;
    }
}
