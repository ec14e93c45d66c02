//! Clients for the local ML sidecar (`POST /embed`, `POST /rerank`,
//! `POST /extract-entities`, `GET /health`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use pdr_core::{EmbedProvider, Error, Reranker, Result};

use crate::http::{build_client, endpoint, post_json};

#[derive(Debug, Serialize)]
pub struct EmbedRequest<'a> {
    pub texts: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RerankRequest<'a> {
    pub query: &'a str,
    pub documents: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct RerankResponse {
    pub scores: Vec<f32>,
    pub count: usize,
}

/// Embeds through the sidecar, `batch_size` texts per request.
pub struct SidecarEmbedder {
    client: reqwest::Client,
    base_url: String,
    dim: usize,
    batch_size: usize,
    id: String,
}

impl SidecarEmbedder {
    pub fn new(base_url: &str, model: &str, dim: usize, batch_size: usize, timeout: Duration) -> Result<Self> {
        if dim == 0 { return Err(Error::InvalidConfig("embedding dimension must be positive".into())); }
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            dim,
            batch_size: batch_size.max(1),
            id: format!("sidecar:{model}:d{dim}"),
        })
    }

    pub async fn health(&self) -> Result<()> {
        let url = endpoint(&self.base_url, "health");
        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() { Error::Timeout(format!("{url}: {e}")) } else { Error::Http(format!("{url}: {e}")) }
        })?;
        if resp.status().is_success() { Ok(()) } else { Err(Error::Provider { status: resp.status().as_u16(), message: "health check failed".into() }) }
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = endpoint(&self.base_url, "embed");
        let resp: EmbedResponse = post_json(&self.client, &url, &EmbedRequest { texts })
            .await
            .map_err(|e| match e {
                Error::Decode(m) => Error::Embedding(m),
                other => other,
            })?;
        check_embed_response(&resp, texts.len(), self.dim)?;
        Ok(resp.embeddings)
    }
}

fn check_embed_response(resp: &EmbedResponse, expected: usize, dim: usize) -> Result<()> {
    if resp.count != expected || resp.embeddings.len() != expected {
        return Err(Error::Embedding(format!("expected {expected} embeddings, sidecar returned {}", resp.embeddings.len())));
    }
    if resp.dimension != dim || resp.embeddings.iter().any(|v| v.len() != dim) {
        return Err(Error::Embedding(format!("expected dimension {dim}, sidecar returned {}", resp.dimension)));
    }
    Ok(())
}

impl EmbedProvider for SidecarEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_one_batch(batch).await?);
        }
        tracing::debug!(texts = texts.len(), "sidecar embedded batch");
        Ok(out)
    }
}

/// Cross-encoder rescoring through the sidecar.
pub struct SidecarReranker {
    client: reqwest::Client,
    base_url: String,
}

impl SidecarReranker {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self { client: build_client(timeout)?, base_url: base_url.to_string() })
    }
}

impl Reranker for SidecarReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() { return Ok(vec![]); }
        let url = endpoint(&self.base_url, "rerank");
        let resp: RerankResponse = post_json(&self.client, &url, &RerankRequest { query, documents }).await?;
        if resp.count != documents.len() || resp.scores.len() != documents.len() {
            return Err(Error::Decode(format!("expected {} rerank scores, got {}", documents.len(), resp.scores.len())));
        }
        Ok(resp.scores)
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractEntitiesRequest<'a> {
    pub chunks: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub score: f32,
}

/// Entities found in one input chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEntities {
    pub text: String,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractEntitiesResponse {
    pub results: Vec<ChunkEntities>,
    pub total_entities: usize,
}

/// Named-entity extraction through the sidecar. One result per input chunk.
pub struct SidecarEntityExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl SidecarEntityExtractor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self { client: build_client(timeout)?, base_url: base_url.to_string() })
    }

    pub async fn extract(&self, chunks: &[String]) -> Result<Vec<ChunkEntities>> {
        if chunks.is_empty() { return Ok(vec![]); }
        let url = endpoint(&self.base_url, "extract-entities");
        let resp: ExtractEntitiesResponse = post_json(&self.client, &url, &ExtractEntitiesRequest { chunks }).await?;
        check_entities_response(&resp, chunks.len())?;
        tracing::debug!(chunks = chunks.len(), entities = resp.total_entities, "sidecar extracted entities");
        Ok(resp.results)
    }
}

fn check_entities_response(resp: &ExtractEntitiesResponse, expected: usize) -> Result<()> {
    if resp.results.len() != expected {
        return Err(Error::Decode(format!("expected {expected} entity results, sidecar returned {}", resp.results.len())));
    }
    let counted: usize = resp.results.iter().map(|r| r.entities.len()).sum();
    if counted != resp.total_entities {
        return Err(Error::Decode(format!("total_entities {} but {counted} entities listed", resp.total_entities)));
    }
    Ok(())
}
