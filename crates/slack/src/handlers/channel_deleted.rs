use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use hindsight_db::repositories::TeamRepository;
use hindsight_index::{IndexGateway, VectorIndexEngine};

use crate::dispatch::{EventHandler, EventHandlerError};
use crate::events::{EventCallback, SlackEvent, SlackEventType};

/// Removes everything indexed from a deleted channel. Covers both public
/// channels and private groups.
pub struct ChannelDeletedHandler {
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
}

impl ChannelDeletedHandler {
    pub fn new(teams: Arc<dyn TeamRepository>, engine: Arc<dyn VectorIndexEngine>) -> Self {
        Self { teams, engine }
    }
}

#[async_trait]
impl EventHandler for ChannelDeletedHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ChannelDeleted
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        let SlackEvent::ChannelDeleted { channel_id } = &callback.event else {
            return Ok(());
        };

        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        gateway.delete_channel(channel_id).await?;
        info!(team_id = %team.team_id, channel_id = %channel_id, "deleted channel documents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use hindsight_db::InMemoryTeamRepository;
    use hindsight_index::InMemoryIndexEngine;

    use super::*;
    use crate::client::fake::FakeSlackApi;
    use crate::handlers::MessageHandler;

    #[tokio::test]
    async fn only_the_deleted_channels_documents_go() {
        let slack = Arc::new(FakeSlackApi::new());
        let teams: Arc<dyn TeamRepository> = Arc::new(InMemoryTeamRepository::new());
        let engine = Arc::new(InMemoryIndexEngine::new());
        let messages = MessageHandler::new(slack, teams.clone(), engine.clone());

        for (channel, ts) in [("C1", "1.0"), ("C2", "2.0")] {
            messages
                .handle(
                    &EventCallback::parse(&json!({
                        "team_id": "T1",
                        "event_time": 1_629_470_261,
                        "authorizations": [{"user_id": "B1"}],
                        "event": {
                            "type": "message",
                            "channel": channel,
                            "channel_type": "channel",
                            "user": "U1",
                            "text": "hello",
                            "ts": ts,
                        },
                    }))
                    .unwrap(),
                )
                .await
                .unwrap();
        }
        assert_eq!(engine.document_count("MessageT1"), 3);

        let handler = ChannelDeletedHandler::new(teams, engine.clone());
        handler
            .handle(
                &EventCallback::parse(&json!({
                    "team_id": "T1",
                    "event_time": 1_629_470_262,
                    "authorizations": [{"user_id": "B1"}],
                    "event": {"type": "channel_deleted", "channel": "C1"},
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(engine.document_count("MessageT1"), 2);
        let docs = engine.documents("MessageT1");
        assert!(docs.iter().all(|d| d.metadata.channel_id != "C1"));
    }
}
