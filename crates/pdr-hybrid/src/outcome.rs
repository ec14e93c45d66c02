use pdr_core::{RetrievalMethod, SearchResult};

/// What a scoped search produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FusionOutcome {
    /// Both rankers answered and their lists were fused.
    Fused(Vec<SearchResult>),
    /// A ranker failed; results come from BM25 alone.
    Degraded { reason: String, results: Vec<SearchResult> },
    /// Nothing to rank, or even the fallback failed.
    Empty,
}

impl FusionOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Fused(results) | Self::Degraded { results, .. } => results,
            Self::Empty => &[],
        }
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Fused(results) | Self::Degraded { results, .. } => results,
            Self::Empty => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool { matches!(self, Self::Degraded { .. }) }

    pub fn is_empty(&self) -> bool { self.results().is_empty() }

    pub fn method(&self) -> Option<RetrievalMethod> {
        match self {
            Self::Fused(_) => Some(RetrievalMethod::EnsembleRrf),
            Self::Degraded { .. } => Some(RetrievalMethod::Bm25Fallback),
            Self::Empty => None,
        }
    }
}
