use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use hindsight_core::scope::{permalink_filter, retrieval_filter};
use hindsight_index::IndexGateway;

use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel};
use crate::prompt;

pub const DOCUMENT_NOT_FOUND: &str = "Document is not found.";

/// How many documents a semantic search feeds into the answer.
const SEARCH_LIMIT: usize = 4;

/// The retrieval capabilities the chat chain can call as tools. A
/// capability trait rather than a retriever base type, so tests script it
/// without an index.
#[async_trait]
pub trait RetrievalTools: Send + Sync {
    /// Answers a natural-language question from indexed conversations
    /// outside the current thread.
    async fn conversation_search(&self, question: &str) -> Result<String, AgentError>;

    /// Returns the content of the document indexed under an exact
    /// permalink, or a fixed not-found sentence.
    async fn url_search(&self, url: &str) -> Result<String, AgentError>;
}

/// Scoped retrieval over one team's index.
///
/// `conversation_search` runs map-reduce question answering: each
/// retrieved document is distilled against the question, then the extracts
/// are combined into one answer. `url_search` is an exact metadata lookup
/// with no model involvement.
pub struct Retriever {
    gateway: IndexGateway,
    model: Arc<dyn ChatModel>,
    model_name: String,
    temperature: f64,
    is_private: bool,
    channel_id: String,
    thread_ts: String,
}

impl Retriever {
    pub fn new(
        gateway: IndexGateway,
        model: Arc<dyn ChatModel>,
        model_name: &str,
        temperature: f64,
        is_private: bool,
        channel_id: &str,
        thread_ts: &str,
    ) -> Self {
        Self {
            gateway,
            model,
            model_name: model_name.to_string(),
            temperature,
            is_private,
            channel_id: channel_id.to_string(),
            thread_ts: thread_ts.to_string(),
        }
    }
}

#[async_trait]
impl RetrievalTools for Retriever {
    async fn conversation_search(&self, question: &str) -> Result<String, AgentError> {
        let filter = retrieval_filter(self.is_private, &self.channel_id, &self.thread_ts);
        let documents = self.gateway.similarity_search(question, &filter, SEARCH_LIMIT).await?;
        debug!(channel_id = %self.channel_id, hits = documents.len(), "conversation search");
        if documents.is_empty() {
            return Ok(DOCUMENT_NOT_FOUND.to_string());
        }

        let mut extracts = Vec::with_capacity(documents.len());
        for document in &documents {
            let extract = self
                .model
                .chat(
                    &self.model_name,
                    self.temperature,
                    &[
                        ChatMessage::system(prompt::question_message(&document.content)),
                        ChatMessage::user(question),
                    ],
                )
                .await?;
            extracts.push(extract);
        }

        let answer = self
            .model
            .chat(
                &self.model_name,
                self.temperature,
                &[
                    ChatMessage::system(prompt::combine_message(&extracts.join("\n\n"))),
                    ChatMessage::user(question),
                ],
            )
            .await?;
        Ok(answer)
    }

    async fn url_search(&self, url: &str) -> Result<String, AgentError> {
        let filter = permalink_filter(self.is_private, &self.channel_id, url);
        let documents = self.gateway.query(&filter, 1).await?;
        Ok(documents
            .into_iter()
            .next()
            .map(|document| document.content)
            .unwrap_or_else(|| DOCUMENT_NOT_FOUND.to_string()))
    }
}
