use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use hindsight_core::document::Document;
use hindsight_core::scope::{Filter, Operator};

use super::engine::{IndexError, VectorIndexEngine};

/// Map-backed engine for tests. Similarity search ranks by naive term
/// overlap, which is enough to assert scoping and plumbing.
#[derive(Default)]
pub struct InMemoryIndexEngine {
    collections: Mutex<HashMap<String, Vec<(Uuid, Document)>>>,
}

impl InMemoryIndexEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .expect("lock")
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .expect("lock")
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }
}

fn matches(filter: &Filter, document: &Document) -> bool {
    match filter {
        Filter::And(operands) => operands.iter().all(|f| matches(f, document)),
        Filter::Or(operands) => operands.iter().any(|f| matches(f, document)),
        Filter::Cond { path, operator, value } => {
            let metadata = &document.metadata;
            let actual = match path.as_str() {
                "file_or_attachment_id" => &metadata.file_or_attachment_id,
                "content_type" => &metadata.content_type,
                "channel_type" => &metadata.channel_type,
                "channel_id" => &metadata.channel_id,
                "thread_ts" => &metadata.thread_ts,
                "ts" => &metadata.ts,
                "permalink" => &metadata.permalink,
                _ => return false,
            };
            match operator {
                Operator::Equal => actual == value,
                Operator::NotEqual => actual != value,
            }
        }
    }
}

fn overlap_score(query: &str, content: &str) -> usize {
    let content = content.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|term| content.contains(term))
        .count()
}

#[async_trait]
impl VectorIndexEngine for InMemoryIndexEngine {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        Ok(self.collections.lock().expect("lock").contains_key(collection))
    }

    async fn create_collection(
        &self,
        collection: &str,
        _description: &str,
    ) -> Result<(), IndexError> {
        self.collections
            .lock()
            .expect("lock")
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), IndexError> {
        self.collections.lock().expect("lock").remove(collection);
        Ok(())
    }

    async fn add_document(
        &self,
        collection: &str,
        document: &Document,
        id: Option<Uuid>,
    ) -> Result<Uuid, IndexError> {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut collections = self.collections.lock().expect("lock");
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| IndexError::Rejected(format!("no collection {collection}")))?;
        documents.retain(|(existing, _)| *existing != id);
        documents.push((id, document.clone()));
        Ok(id)
    }

    async fn delete_where(&self, collection: &str, filter: &Filter) -> Result<(), IndexError> {
        let mut collections = self.collections.lock().expect("lock");
        if let Some(documents) = collections.get_mut(collection) {
            documents.retain(|(_, doc)| !matches(filter, doc));
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError> {
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|doc| matches(filter, doc))
            .take(limit)
            .collect())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError> {
        let mut scored: Vec<(usize, Document)> = self
            .documents(collection)
            .into_iter()
            .filter(|doc| matches(filter, doc))
            .map(|doc| (overlap_score(query, &doc.content), doc))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, doc)| doc).collect())
    }
}
