//! Brute-force cosine search over vectors held in process.

use std::sync::RwLock;

use pdr_core::types::sanitize_score;
use pdr_core::{Chunk, ChunkId, Error, Result, SearchScope, VectorHit, VectorStore};

struct Entry {
    chunk_id: ChunkId,
    document_id: String,
    company_id: Option<String>,
    vector: Vec<f32>,
}

impl Entry {
    fn in_scope(&self, scope: &SearchScope) -> bool {
        match scope {
            SearchScope::Document(id) => self.document_id == *id,
            SearchScope::Company(id) => self.company_id.as_deref() == Some(id.as_str()),
            SearchScope::MultiDocument(ids) => ids.contains(&self.document_id),
        }
    }
}

#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::InvalidInput(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
        }
        let mut entries = self.entries.write().map_err(|_| Error::VectorStore("vector store lock poisoned".into()))?;
        for (c, v) in chunks.iter().zip(embeddings) {
            entries.push(Entry { chunk_id: c.id.clone(), document_id: c.document_id.clone(), company_id: c.company_id.clone(), vector: v.clone() });
        }
        Ok(())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

impl VectorStore for MemoryVectorStore {
    async fn nearest(&self, scope: &SearchScope, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let entries = self.entries.read().map_err(|_| Error::VectorStore("vector store lock poisoned".into()))?;
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != query.len()) {
            return Err(Error::VectorStore(format!("query dimension {} does not match stored dimension {}", query.len(), bad.vector.len())));
        }
        let mut hits: Vec<VectorHit> = entries
            .iter()
            .filter(|e| e.in_scope(scope))
            .map(|e| VectorHit { chunk_id: e.chunk_id.clone(), score: sanitize_score(cosine(&e.vector, query)) })
            .collect();
        // stable: equal similarity keeps insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
