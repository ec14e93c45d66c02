//! pdr-embed
//!
//! Embedding providers for the vector ranker and the ingest path: the ML
//! sidecar over HTTP, and a deterministic hash embedder for tests and offline
//! work. Also carries the sidecar's cross-encoder reranker and entity
//! extraction clients.

pub mod hash;
pub mod http;
pub mod sidecar;

pub use hash::HashEmbedder;
pub use sidecar::{ChunkEntities, Entity, SidecarEmbedder, SidecarEntityExtractor, SidecarReranker};

use std::time::Duration;

use pdr_core::config::EmbeddingSettings;
use pdr_core::{EmbedProvider, Error, Result};

/// The provider picked from configuration.
pub enum Embedder {
    Sidecar(SidecarEmbedder),
    Hash(HashEmbedder),
}

impl EmbedProvider for Embedder {
    fn embedder_id(&self) -> &str {
        match self { Self::Sidecar(e) => e.embedder_id(), Self::Hash(e) => e.embedder_id() }
    }

    fn dim(&self) -> usize {
        match self { Self::Sidecar(e) => e.dim(), Self::Hash(e) => e.dim() }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Sidecar(e) => e.embed_batch(texts).await,
            Self::Hash(e) => e.embed_batch(texts).await,
        }
    }
}

impl Embedder {
    /// Probe the backing service; the hash embedder is always ready.
    pub async fn health(&self) -> Result<()> {
        match self {
            Self::Sidecar(e) => e.health().await,
            Self::Hash(_) => Ok(()),
        }
    }
}

/// Select the embedder named by `settings.provider`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hash embedder regardless of
/// configuration.
pub fn embedder_from_settings(settings: &EmbeddingSettings, dim: usize) -> Result<Embedder> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || settings.provider == "hash" {
        tracing::info!(dim, "using hash embedder");
        return Ok(Embedder::Hash(HashEmbedder::new(dim)));
    }
    match settings.provider.as_str() {
        "sidecar" => Ok(Embedder::Sidecar(SidecarEmbedder::new(
            &settings.sidecar_url,
            &settings.model,
            dim,
            settings.batch_size,
            Duration::from_secs(settings.timeout_secs),
        )?)),
        other => Err(Error::InvalidConfig(format!("unknown embedding provider '{other}'"))),
    }
}
