//! pdr-hybrid
//!
//! Rank fusion over one scoped chunk set. [`EnsembleRetriever`] runs BM25
//! (`pdr-text`) and vector similarity (`pdr-vector`) over the same chunks and
//! merges them with weighted reciprocal-rank fusion, dropping to BM25 alone
//! when the vector side fails.

pub mod engine;
pub mod fusion;
pub mod outcome;
pub mod rerank;

pub use engine::{CompanySearch, DocumentSearch, EnsembleRetriever, MultiDocumentSearch};
pub use fusion::{weighted_rrf, FusedCandidate, FusionWeights, DEFAULT_RRF_K};
pub use outcome::FusionOutcome;
pub use rerank::rerank_results;
