use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use hindsight_core::document::Document;
use hindsight_core::scope::Filter;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index transport error: {0}")]
    Transport(String),
    #[error("index engine rejected the request: {0}")]
    Rejected(String),
    #[error("could not decode index response: {0}")]
    Decode(String),
}

/// Storage-level operations a vector store must provide.
///
/// Collections are named per team; documents carry a closed metadata set
/// (see [`DocumentMetadata`]). Implementations do not interpret filters
/// beyond translating them to their native query form.
///
/// [`DocumentMetadata`]: hindsight_core::document::DocumentMetadata
#[async_trait]
pub trait VectorIndexEngine: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError>;

    async fn create_collection(
        &self,
        collection: &str,
        description: &str,
    ) -> Result<(), IndexError>;

    /// Drops the whole collection. Succeeds when it does not exist.
    async fn delete_collection(&self, collection: &str) -> Result<(), IndexError>;

    /// Inserts one document, with a caller-chosen id or a random one.
    /// Re-inserting an existing id overwrites the stored object.
    async fn add_document(
        &self,
        collection: &str,
        document: &Document,
        id: Option<Uuid>,
    ) -> Result<Uuid, IndexError>;

    /// Deletes every document matching `filter`.
    async fn delete_where(&self, collection: &str, filter: &Filter) -> Result<(), IndexError>;

    /// Exact-match retrieval, no vector scoring.
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError>;

    /// Nearest-neighbour search over `query`, constrained by `filter`.
    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError>;
}
