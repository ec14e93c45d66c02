//! Scoped ensemble search: fetch the chunk set, rank it lexically and by
//! vector similarity, fuse with weighted RRF. Callers never see an error;
//! failures surface as [`FusionOutcome::Degraded`] or [`FusionOutcome::Empty`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use pdr_core::config::RetrievalSettings;
use pdr_core::{Chunk, ChunkStore, EmbedProvider, Error, Result, RetrievalMethod, SearchResult, SearchScope, VectorStore};
use pdr_text::{rank_lexical, LexicalHit};
use pdr_vector::VectorRanker;

use crate::fusion::{weighted_rrf, FusionWeights};
use crate::outcome::FusionOutcome;

#[derive(Debug, Clone, Default)]
pub struct DocumentSearch {
    pub document_id: String,
    pub top_k: Option<usize>,
    pub weights: Option<FusionWeights>,
}

impl DocumentSearch {
    pub fn new(document_id: impl Into<String>) -> Self { Self { document_id: document_id.into(), ..Default::default() } }
}

#[derive(Debug, Clone, Default)]
pub struct CompanySearch {
    pub company_id: String,
    pub top_k: Option<usize>,
    pub weights: Option<FusionWeights>,
}

impl CompanySearch {
    pub fn new(company_id: impl Into<String>) -> Self { Self { company_id: company_id.into(), ..Default::default() } }
}

#[derive(Debug, Clone, Default)]
pub struct MultiDocumentSearch {
    pub document_ids: Vec<String>,
    pub top_k: Option<usize>,
    pub weights: Option<FusionWeights>,
}

impl MultiDocumentSearch {
    pub fn new(document_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { document_ids: document_ids.into_iter().map(Into::into).collect(), ..Default::default() }
    }
}

pub struct EnsembleRetriever<S, V, E> {
    store: S,
    vector: VectorRanker<V, E>,
    settings: RetrievalSettings,
}

impl<S, V, E> EnsembleRetriever<S, V, E>
where
    S: ChunkStore,
    V: VectorStore,
    E: EmbedProvider,
{
    /// Fails with [`Error::InvalidConfig`] when `settings` do not validate.
    pub fn new(store: S, vector_store: V, embedder: E, settings: RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { store, vector: VectorRanker::new(vector_store, embedder), settings })
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub async fn document_ensemble_search(&self, query: &str, opts: DocumentSearch) -> Vec<SearchResult> {
        self.search(query, SearchScope::Document(opts.document_id), opts.top_k, opts.weights).await.into_results()
    }

    pub async fn company_ensemble_search(&self, query: &str, opts: CompanySearch) -> Vec<SearchResult> {
        self.search(query, SearchScope::Company(opts.company_id), opts.top_k, opts.weights).await.into_results()
    }

    pub async fn multi_doc_ensemble_search(&self, query: &str, opts: MultiDocumentSearch) -> Vec<SearchResult> {
        self.search(query, SearchScope::MultiDocument(opts.document_ids), opts.top_k, opts.weights).await.into_results()
    }

    /// Same as [`search`](Self::search), but gives up with `Empty` once
    /// `deadline` passes.
    pub async fn search_within(
        &self,
        deadline: Duration,
        query: &str,
        scope: SearchScope,
        top_k: Option<usize>,
        weights: Option<FusionWeights>,
    ) -> FusionOutcome {
        match tokio::time::timeout(deadline, self.search(query, scope, top_k, weights)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(deadline_ms = deadline.as_millis() as u64, "ensemble search timed out");
                FusionOutcome::Empty
            }
        }
    }

    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        top_k: Option<usize>,
        weights: Option<FusionWeights>,
    ) -> FusionOutcome {
        if scope.is_empty() {
            tracing::debug!(scope = %scope.kind(), "empty document set, skipping search");
            return FusionOutcome::Empty;
        }
        let top_k = self.resolve_top_k(&scope, top_k);
        let weights = self.resolve_weights(weights);
        let timestamp = Utc::now();
        tracing::debug!(scope = %scope.kind(), top_k, query, "ensemble search");

        let chunks = match self.store.chunks_for(&scope).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::error!(scope = %scope.kind(), error = %err, "chunk fetch failed");
                return FusionOutcome::Empty;
            }
        };
        if chunks.is_empty() {
            tracing::debug!(scope = %scope.kind(), "no chunks in scope");
            return FusionOutcome::Empty;
        }
        let chunks: Arc<[Chunk]> = distinct_by_id(chunks).into();

        match self.ensemble(&scope, query, &chunks, top_k, weights, timestamp).await {
            Ok(results) => FusionOutcome::Fused(results),
            Err(err) => {
                tracing::warn!(scope = %scope.kind(), error = %err, "ensemble ranking failed, falling back to bm25");
                match lexical_only(&scope, query, &chunks, top_k, timestamp).await {
                    Ok(results) => FusionOutcome::Degraded { reason: err.to_string(), results },
                    Err(fallback_err) => {
                        tracing::error!(scope = %scope.kind(), error = %fallback_err, "bm25 fallback failed");
                        FusionOutcome::Empty
                    }
                }
            }
        }
    }

    async fn ensemble(
        &self,
        scope: &SearchScope,
        query: &str,
        chunks: &Arc<[Chunk]>,
        top_k: usize,
        weights: FusionWeights,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>> {
        let (lexical, vector) = futures::join!(
            lexical_hits(Arc::clone(chunks), query, top_k),
            self.vector.rank(scope, query, chunks, top_k),
        );
        let lexical: Vec<usize> = lexical?.into_iter().map(|h| h.ord).collect();
        let vector: Vec<usize> = vector?.into_iter().map(|h| h.ord).collect();
        tracing::debug!(lexical = lexical.len(), vector = vector.len(), "ranker hits");

        let mut fused = weighted_rrf(&[(&lexical, weights.lexical), (&vector, weights.vector)], self.settings.rrf_k);
        fused.truncate(top_k);
        Ok(fused
            .into_iter()
            .map(|c| {
                let mut result = SearchResult::from_chunk(
                    &chunks[c.ord],
                    c.score,
                    RetrievalMethod::EnsembleRrf,
                    scope.kind(),
                    timestamp,
                );
                result.metadata.lexical_rank = c.ranks[0];
                result.metadata.vector_rank = c.ranks[1];
                result
            })
            .collect())
    }

    fn resolve_top_k(&self, scope: &SearchScope, top_k: Option<usize>) -> usize {
        top_k.filter(|k| *k > 0).unwrap_or(match scope {
            SearchScope::Document(_) => self.settings.document_top_k,
            SearchScope::Company(_) => self.settings.company_top_k,
            SearchScope::MultiDocument(_) => self.settings.multi_document_top_k,
        })
    }

    fn resolve_weights(&self, weights: Option<FusionWeights>) -> FusionWeights {
        let default = FusionWeights::from(self.settings.weights);
        match weights {
            Some(w) if w.is_valid() => w,
            Some(w) => {
                tracing::warn!(lexical = w.lexical, vector = w.vector, "invalid fusion weights, using configured default");
                default
            }
            None => default,
        }
    }
}

/// BM25 over the chunk set on the blocking pool, so index building neither
/// stalls the runtime nor outlives a caller's deadline.
async fn lexical_hits(chunks: Arc<[Chunk]>, query: &str, top_k: usize) -> Result<Vec<LexicalHit>> {
    let query = query.to_string();
    tokio::task::spawn_blocking(move || rank_lexical(&chunks, &query, top_k))
        .await
        .map_err(|e| Error::Index(format!("bm25 task failed: {e}")))?
}

/// Keep the first chunk for each id; fused candidates are keyed by chunk id.
fn distinct_by_id(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let total = chunks.len();
    let mut seen = HashSet::with_capacity(total);
    let distinct: Vec<Chunk> = chunks.into_iter().filter(|c| seen.insert(c.id.clone())).collect();
    if distinct.len() < total {
        tracing::warn!(duplicates = total - distinct.len(), "chunk store returned repeated chunk ids");
    }
    distinct
}

async fn lexical_only(
    scope: &SearchScope,
    query: &str,
    chunks: &Arc<[Chunk]>,
    top_k: usize,
    timestamp: DateTime<Utc>,
) -> Result<Vec<SearchResult>> {
    let hits = lexical_hits(Arc::clone(chunks), query, top_k).await?;
    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(pos, hit)| {
            let mut result =
                SearchResult::from_chunk(&chunks[hit.ord], hit.score, RetrievalMethod::Bm25Fallback, scope.kind(), timestamp);
            result.metadata.lexical_rank = Some(pos + 1);
            result
        })
        .collect())
}
