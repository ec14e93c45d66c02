//! Seams between the retrieval core and its external collaborators.
//!
//! Every collaborator is a read-only dependency: nothing here mutates shared
//! ranking state, so implementations only need to be `Send + Sync`.

use std::future::Future;

use crate::error::Result;
use crate::types::{Chunk, SearchScope, VectorHit};

/// Fetches chunk sets by scope. Implementations return chunks ordered by
/// document, then `chunk_index`.
pub trait ChunkStore: Send + Sync {
    fn get_chunks_by_document(&self, document_id: &str) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    fn get_chunks_by_company(&self, company_id: &str) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    fn get_chunks_by_document_set(&self, document_ids: &[String]) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    fn chunks_for(&self, scope: &SearchScope) -> impl Future<Output = Result<Vec<Chunk>>> + Send {
        async move {
            match scope {
                SearchScope::Document(id) => self.get_chunks_by_document(id).await,
                SearchScope::Company(id) => self.get_chunks_by_company(id).await,
                SearchScope::MultiDocument(ids) => self.get_chunks_by_document_set(ids).await,
            }
        }
    }
}

/// Turns text into embedding vectors.
pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `sidecar:bge-large:d1024`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    /// Compute embeddings for a batch of input texts, one vector per input.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        let texts = vec![text.to_string()];
        async move {
            self.embed_batch(&texts)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| crate::Error::Embedding("provider returned no vector for query".into()))
        }
    }
}

/// Nearest-neighbour lookup scoped the same way as [`ChunkStore`].
pub trait VectorStore: Send + Sync {
    fn nearest(&self, scope: &SearchScope, query: &[f32], k: usize) -> impl Future<Output = Result<Vec<VectorHit>>> + Send;
}

/// Rescores documents against a query; one score per document, higher is better.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, documents: &[String]) -> impl Future<Output = Result<Vec<f32>>> + Send;
}
