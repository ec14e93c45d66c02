//! Fan-out execution of planned sub-queries.
//!
//! Every query runs concurrently with its own sequential retry chain. A query
//! that exhausts its attempts is logged and dropped; the batch itself never
//! fails. Results are concatenated in the original query order.

use futures::future::join_all;
use serde::Serialize;

use crate::provider::SearchProvider;
use crate::retry::RetryPolicy;
use crate::types::{PlannedQuery, RetrievedWebResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum QueryStatus {
    Succeeded { results: usize },
    Failed { error: String },
}

/// How one planned query went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub search_query: String,
    pub attempts: usize,
    #[serde(flatten)]
    pub status: QueryStatus,
}

impl QueryOutcome {
    pub fn succeeded(&self) -> bool { matches!(self.status, QueryStatus::Succeeded { .. }) }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchBatch {
    pub results: Vec<RetrievedWebResult>,
    /// One entry per planned query, in input order.
    pub outcomes: Vec<QueryOutcome>,
}

impl SearchBatch {
    /// Provider calls made across the batch.
    pub fn total_attempts(&self) -> usize { self.outcomes.iter().map(|o| o.attempts).sum() }

    pub fn failed(&self) -> usize { self.outcomes.iter().filter(|o| !o.succeeded()).count() }
}

pub struct SearchExecutor<P> {
    provider: P,
    policy: RetryPolicy,
}

impl<P: SearchProvider> SearchExecutor<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self { Self { provider, policy } }

    pub fn provider(&self) -> &P { &self.provider }

    pub fn policy(&self) -> RetryPolicy { self.policy }

    pub async fn execute_search(&self, queries: &[PlannedQuery]) -> Vec<RetrievedWebResult> {
        self.execute_search_detailed(queries).await.results
    }

    pub async fn execute_search_detailed(&self, queries: &[PlannedQuery]) -> SearchBatch {
        if queries.is_empty() { return SearchBatch::default(); }
        let runs = join_all(queries.iter().enumerate().map(|(idx, q)| self.run_query(idx, q))).await;

        let mut batch = SearchBatch::default();
        for (results, outcome) in runs {
            batch.results.extend(results);
            batch.outcomes.push(outcome);
        }
        tracing::info!(
            queries = queries.len(),
            failed = batch.failed(),
            results = batch.results.len(),
            calls = batch.total_attempts(),
            "web search batch finished"
        );
        batch
    }

    async fn run_query(&self, idx: usize, query: &PlannedQuery) -> (Vec<RetrievedWebResult>, QueryOutcome) {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(query = idx, attempt, text = query.search_query(), "web search attempt");
            match self.provider.search(query).await {
                Ok(results) => {
                    tracing::debug!(query = idx, attempt, count = results.len(), "web search succeeded");
                    let outcome = QueryOutcome {
                        search_query: query.search_query().to_string(),
                        attempts: attempt,
                        status: QueryStatus::Succeeded { results: results.len() },
                    };
                    return (results, outcome);
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(query = idx, attempt, max_attempts, error = %err, "web search attempt failed, retrying");
                    self.policy.pause().await;
                }
                Err(err) => {
                    tracing::warn!(query = idx, attempts = attempt, category = %query.category(), error = %err, "web search query dropped");
                    let outcome = QueryOutcome {
                        search_query: query.search_query().to_string(),
                        attempts: attempt,
                        status: QueryStatus::Failed { error: err.to_string() },
                    };
                    return (Vec::new(), outcome);
                }
            }
        }
    }
}
