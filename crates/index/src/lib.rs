//! Per-workspace vector index access.
//!
//! [`VectorIndexEngine`] abstracts the vector store; [`WeaviateEngine`]
//! talks to a Weaviate server over REST/GraphQL and
//! [`InMemoryIndexEngine`] backs tests. [`IndexGateway`] is the only path
//! the rest of the system uses to mutate a team's index.

pub mod engine;
pub mod gateway;
pub mod memory;
pub mod placeholder;
pub mod weaviate;

pub use engine::{IndexError, VectorIndexEngine};
pub use gateway::IndexGateway;
pub use memory::InMemoryIndexEngine;
pub use weaviate::WeaviateEngine;
