use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use hindsight_db::repositories::TeamRepository;
use hindsight_index::{IndexGateway, VectorIndexEngine};

use crate::dispatch::{EventHandler, EventHandlerError};
use crate::events::{EventCallback, SlackEvent, SlackEventType};

/// Removes every page of a deleted file from the index.
pub struct FileDeletedHandler {
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
}

impl FileDeletedHandler {
    pub fn new(teams: Arc<dyn TeamRepository>, engine: Arc<dyn VectorIndexEngine>) -> Self {
        Self { teams, engine }
    }
}

#[async_trait]
impl EventHandler for FileDeletedHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::FileDeleted
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        let SlackEvent::FileDeleted { file_id } = &callback.event else {
            return Ok(());
        };

        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        gateway.delete_file_or_attachment(file_id).await?;
        info!(team_id = %team.team_id, file_id = %file_id, "deleted file documents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use hindsight_core::payload::FilePayload;
    use hindsight_db::InMemoryTeamRepository;
    use hindsight_index::InMemoryIndexEngine;

    use super::*;
    use crate::client::fake::FakeSlackApi;
    use crate::client::FileInfo;
    use crate::handlers::FileSharedHandler;

    #[tokio::test]
    async fn deleting_a_file_removes_all_its_pages() {
        let slack = Arc::new(FakeSlackApi::new());
        slack.files.lock().unwrap().insert(
            "F1".into(),
            FileInfo {
                file: FilePayload {
                    id: "F1".into(),
                    filetype: "text".into(),
                    name: "notes.txt".into(),
                    title: "Notes".into(),
                    permalink: "https://files/F1".into(),
                    ..FilePayload::default()
                },
                content: Some("one two three four five ".repeat(2000)),
            },
        );
        let teams: Arc<dyn TeamRepository> = Arc::new(InMemoryTeamRepository::new());
        let engine = Arc::new(InMemoryIndexEngine::new());

        let share = FileSharedHandler::new(slack.clone(), teams.clone(), engine.clone());
        share
            .handle(
                &EventCallback::parse(&json!({
                    "team_id": "T1",
                    "event_time": 1_629_470_261,
                    "authorizations": [{"user_id": "B1"}],
                    "event": {
                        "type": "file_shared",
                        "file_id": "F1",
                        "channel_id": "C1",
                        "user_id": "U1",
                        "event_ts": "1.0",
                    },
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        assert!(engine.document_count("MessageT1") > 2);

        let delete = FileDeletedHandler::new(teams, engine.clone());
        delete
            .handle(
                &EventCallback::parse(&json!({
                    "team_id": "T1",
                    "event_time": 1_629_470_262,
                    "authorizations": [{"user_id": "B1"}],
                    "event": {"type": "file_deleted", "file_id": "F1"},
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(engine.document_count("MessageT1"), 1);
    }
}
