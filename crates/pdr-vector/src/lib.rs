//! pdr-vector
//!
//! Vector side of the retrieval core. One LanceDB table holds chunk columns
//! and embeddings; [`LanceChunkStore`] and [`LanceVectorStore`] read it through
//! the same scope filter. [`MemoryVectorStore`] is the in-process equivalent.
//! [`VectorRanker`] embeds the query and ranks a chunk set by similarity.

pub mod chunk_store;
pub mod filter;
pub mod memory;
pub mod ranker;
pub mod rows;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use chunk_store::LanceChunkStore;
pub use memory::MemoryVectorStore;
pub use ranker::{VectorRank, VectorRanker};
pub use search::LanceVectorStore;
pub use writer::LanceChunkWriter;
