//! pdr-websearch
//!
//! Executes a research plan's web sub-queries: concurrent fan-out to a
//! [`SearchProvider`], a bounded retry chain per query, and an aggregate in
//! plan order that survives individual query failures.

pub mod executor;
pub mod provider;
pub mod retry;
pub mod types;

pub use executor::{QueryOutcome, QueryStatus, SearchBatch, SearchExecutor};
pub use provider::{decode_results, search_topic, HttpSearchProvider, SearchProvider};
pub use retry::RetryPolicy;
pub use types::{PlannedQuery, QueryCategory, RetrievedWebResult};
