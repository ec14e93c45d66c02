//! pdr-text
//!
//! Lexical ranking for the retrieval core: a BM25 index built in RAM over the
//! chunk set of one query, using tantivy with a lowercasing, stop-word
//! filtering analyzer.

pub mod index;
pub mod tantivy_utils;

pub use index::{Bm25Index, LexicalHit};

use pdr_core::{Chunk, Result};

/// Build an index over `chunks` and return the top `k` hits for `query`.
pub fn rank_lexical(chunks: &[Chunk], query: &str, k: usize) -> Result<Vec<LexicalHit>> {
    Bm25Index::build(chunks)?.search(query, k)
}
