//! Retrieval-augmented mention replies.

pub mod chain;
pub mod error;
pub mod llm;
pub mod memory;
pub mod mention;
pub mod prompt;
pub mod tools;

pub use chain::{ChainSettings, ChatChain};
pub use error::{apology_for, AgentError};
pub use llm::{ChatMessage, ChatModel, ChatModelError, OpenAiChatModel, Role};
pub use memory::ConversationMemory;
pub use mention::AppMentionHandler;
pub use tools::{RetrievalTools, Retriever};
