use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use hindsight_core::document::Document;
use hindsight_core::scope::Filter;

use super::engine::{IndexError, VectorIndexEngine};
use super::placeholder::placeholder_document;

/// The single write path to one team's index.
///
/// Message documents get deterministic uuid-v5 ids derived from the team
/// namespace and the message `ts`, so re-ingesting an edited message
/// overwrites instead of duplicating. Attachment and file documents get
/// random ids and are removed by metadata filters instead.
///
/// Safe to use from many teams concurrently. Within one team, callers must
/// not race add and delete for the same logical document; the engine's
/// last write wins.
pub struct IndexGateway {
    engine: Arc<dyn VectorIndexEngine>,
    team_id: String,
    namespace_uuid: Uuid,
    index_name: String,
}

impl IndexGateway {
    pub fn new(engine: Arc<dyn VectorIndexEngine>, team_id: &str, namespace_uuid: Uuid) -> Self {
        Self {
            engine,
            team_id: team_id.to_string(),
            namespace_uuid,
            index_name: format!("Message{team_id}"),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Creates the collection and its placeholder on first use. Idempotent.
    pub async fn ensure_index(&self) -> Result<(), IndexError> {
        debug!(team_id = %self.team_id, index = %self.index_name, "ensuring index");
        if self.engine.collection_exists(&self.index_name).await? {
            return Ok(());
        }
        self.engine
            .create_collection(
                &self.index_name,
                &format!("A Slack message index for {}", self.team_id),
            )
            .await?;
        self.engine
            .add_document(&self.index_name, &placeholder_document(), None)
            .await?;
        info!(team_id = %self.team_id, index = %self.index_name, "created index");
        Ok(())
    }

    /// The deterministic id of the message document with timestamp `ts`.
    pub fn message_document_id(&self, ts: &str) -> Uuid {
        Uuid::new_v5(&self.namespace_uuid, ts.as_bytes())
    }

    /// Upserts a message document under its deterministic id.
    pub async fn add_message_document(&self, document: &Document) -> Result<Uuid, IndexError> {
        let id = self.message_document_id(&document.metadata.ts);
        self.engine.add_document(&self.index_name, document, Some(id)).await
    }

    /// Adds documents one at a time. A large batch holds the engine's
    /// inserter open long enough to time out, so no batching here.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<(), IndexError> {
        for document in documents {
            self.engine.add_document(&self.index_name, document, None).await?;
        }
        Ok(())
    }

    /// Deletes every document belonging to the message with timestamp `ts`.
    pub async fn delete_message(&self, ts: &str) -> Result<(), IndexError> {
        debug!(team_id = %self.team_id, ts, "deleting message documents");
        self.engine
            .delete_where(&self.index_name, &Filter::equal("ts", ts))
            .await
    }

    /// Deletes the documents of one file or attachment.
    pub async fn delete_file_or_attachment(&self, id: &str) -> Result<(), IndexError> {
        debug!(team_id = %self.team_id, file_or_attachment_id = id, "deleting file documents");
        self.engine
            .delete_where(&self.index_name, &Filter::equal("file_or_attachment_id", id))
            .await
    }

    /// Deletes everything indexed from one channel.
    pub async fn delete_channel(&self, channel_id: &str) -> Result<(), IndexError> {
        debug!(team_id = %self.team_id, channel_id, "deleting channel documents");
        self.engine
            .delete_where(&self.index_name, &Filter::equal("channel_id", channel_id))
            .await
    }

    /// Drops the team's whole index. A no-op when it never existed.
    pub async fn delete_index(&self) -> Result<(), IndexError> {
        info!(team_id = %self.team_id, index = %self.index_name, "deleting index");
        self.engine.delete_collection(&self.index_name).await
    }

    pub async fn query(&self, filter: &Filter, limit: usize) -> Result<Vec<Document>, IndexError> {
        self.engine.query(&self.index_name, filter, limit).await
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError> {
        self.engine.similarity_search(&self.index_name, query, filter, limit).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use hindsight_core::document::DocumentMetadata;

    use super::*;
    use crate::memory::InMemoryIndexEngine;

    fn doc(ts: &str, file_or_attachment_id: &str, channel_id: &str) -> Document {
        Document {
            content: format!("content for {ts}"),
            metadata: DocumentMetadata {
                file_or_attachment_id: file_or_attachment_id.into(),
                content_type: "message".into(),
                channel_type: "channel".into(),
                channel_id: channel_id.into(),
                thread_ts: ts.into(),
                ts: ts.into(),
                permalink: format!("https://example.slack.com/p/{ts}"),
                timestamp: chrono::Utc.with_ymd_and_hms(2021, 8, 20, 14, 37, 41).unwrap(),
            },
        }
    }

    fn gateway(engine: &Arc<InMemoryIndexEngine>) -> IndexGateway {
        IndexGateway::new(engine.clone(), "T1", Uuid::new_v4())
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent_and_seeds_placeholder() {
        let engine = Arc::new(InMemoryIndexEngine::new());
        let gateway = gateway(&engine);

        gateway.ensure_index().await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 1);

        gateway.ensure_index().await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 1);
    }

    #[tokio::test]
    async fn message_reingestion_overwrites_in_place() {
        let engine = Arc::new(InMemoryIndexEngine::new());
        let gateway = gateway(&engine);
        gateway.ensure_index().await.unwrap();

        gateway.add_message_document(&doc("1.0", "", "C1")).await.unwrap();
        let mut edited = doc("1.0", "", "C1");
        edited.content = "edited".into();
        gateway.add_message_document(&edited).await.unwrap();

        // placeholder + exactly one message object
        assert_eq!(engine.document_count("MessageT1"), 2);
        let stored = engine.documents("MessageT1");
        assert!(stored.iter().any(|d| d.content == "edited"));
        assert!(!stored.iter().any(|d| d.content == "content for 1.0"));
    }

    #[tokio::test]
    async fn delete_by_ts_file_and_channel() {
        let engine = Arc::new(InMemoryIndexEngine::new());
        let gateway = gateway(&engine);
        gateway.ensure_index().await.unwrap();

        gateway.add_message_document(&doc("1.0", "", "C1")).await.unwrap();
        gateway.add_documents(&[doc("1.0", "1.0-1", "C1"), doc("2.0", "F1", "C2")]).await.unwrap();

        gateway.delete_file_or_attachment("1.0-1").await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 3);

        gateway.delete_message("1.0").await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 2);

        gateway.delete_channel("C2").await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 1);
    }

    #[tokio::test]
    async fn delete_index_is_noop_when_absent() {
        let engine = Arc::new(InMemoryIndexEngine::new());
        let gateway = gateway(&engine);
        gateway.delete_index().await.unwrap();

        gateway.ensure_index().await.unwrap();
        gateway.delete_index().await.unwrap();
        assert_eq!(engine.document_count("MessageT1"), 0);
    }

    #[tokio::test]
    async fn deterministic_ids_are_stable_per_namespace() {
        let engine = Arc::new(InMemoryIndexEngine::new());
        let namespace = Uuid::new_v4();
        let a = IndexGateway::new(engine.clone(), "T1", namespace);
        let b = IndexGateway::new(engine.clone(), "T1", namespace);
        assert_eq!(a.message_document_id("1.0"), b.message_document_id("1.0"));
        assert_ne!(a.message_document_id("1.0"), a.message_document_id("2.0"));
    }
}
