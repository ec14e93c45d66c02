//! pdr-core
//!
//! Domain types, collaborator traits, configuration and the shared error type
//! for the retrieval core. The ranking crates (`pdr-text`, `pdr-vector`,
//! `pdr-hybrid`) and the web-search executor build on these.

pub mod config;
pub mod error;
pub mod processor;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use store::MemoryChunkStore;
pub use traits::{ChunkStore, EmbedProvider, Reranker, VectorStore};
pub use types::{Chunk, ChunkId, ResultMetadata, RetrievalMethod, ScopeKind, SearchResult, SearchScope, VectorHit};
