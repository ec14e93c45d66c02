use std::collections::HashMap;

use pdr_core::{Chunk, EmbedProvider, Result, SearchScope, VectorStore};

/// A chunk position and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorRank {
    /// Index into the chunk slice passed to [`VectorRanker::rank`].
    pub ord: usize,
    pub score: f32,
}

/// Embeds the query once and asks the store for the nearest chunks in scope.
pub struct VectorRanker<V, E> {
    store: V,
    embedder: E,
}

impl<V: VectorStore, E: EmbedProvider> VectorRanker<V, E> {
    pub fn new(store: V, embedder: E) -> Self { Self { store, embedder } }

    pub fn store(&self) -> &V { &self.store }

    pub fn embedder(&self) -> &E { &self.embedder }

    /// Top `k` chunks of `universe` for `query`. Store hits outside the
    /// universe, or repeated, are dropped. Provider and store errors are
    /// returned as-is.
    pub async fn rank(&self, scope: &SearchScope, query: &str, universe: &[Chunk], k: usize) -> Result<Vec<VectorRank>> {
        if k == 0 || universe.is_empty() { return Ok(vec![]); }
        let query_vec = self.embedder.embed_query(query).await?;
        let hits = self.store.nearest(scope, &query_vec, k).await?;
        let by_id: HashMap<&str, usize> = universe.iter().enumerate().map(|(ord, c)| (c.id.as_str(), ord)).collect();
        let mut seen = vec![false; universe.len()];
        let mut ranked = Vec::with_capacity(hits.len());
        for hit in hits {
            match by_id.get(hit.chunk_id.as_str()) {
                Some(&ord) if !seen[ord] => {
                    seen[ord] = true;
                    ranked.push(VectorRank { ord, score: hit.score });
                }
                Some(_) => {}
                None => tracing::debug!(chunk_id = %hit.chunk_id, "vector hit outside chunk set dropped"),
            }
        }
        ranked.truncate(k);
        Ok(ranked)
    }
}
