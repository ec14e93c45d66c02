//! Domain types shared by the lexical, vector and fusion layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// A unit of retrievable text owned by the chunk store.
///
/// - `id`: globally unique chunk identifier
/// - `document_id`: the document the chunk was cut from
/// - `company_id`: owning company, when the store tracks it
/// - `page`: source page number, when known
/// - `chunk_index`: position within the parent document
/// - `parent_id`: the larger chunk this one was split from, if any
/// - `source_method`: provenance of the text (e.g. "ocr", "pdf_text")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default)]
    pub parent_id: Option<ChunkId>,
    #[serde(default)]
    pub source_method: Option<String>,
    #[serde(default)]
    pub meta: Meta,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, document_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            company_id: None,
            content: content.into(),
            page: None,
            chunk_index: 0,
            parent_id: None,
            source_method: None,
            meta: Meta::new(),
        }
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_index(mut self, chunk_index: usize) -> Self {
        self.chunk_index = chunk_index;
        self
    }
}

/// The boundary a retrieval runs over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum SearchScope {
    Document(String),
    Company(String),
    MultiDocument(Vec<String>),
}

impl SearchScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Document(_) => ScopeKind::Document,
            Self::Company(_) => ScopeKind::Company,
            Self::MultiDocument(_) => ScopeKind::MultiDocument,
        }
    }

    /// True when the scope cannot select any chunk.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::MultiDocument(ids) if ids.is_empty())
    }
}

/// Tag value of a scope as it appears on results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    Document,
    Company,
    MultiDocument,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Company => "company",
            Self::MultiDocument => "multi-document",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    EnsembleRrf,
    Bm25Fallback,
}

impl RetrievalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnsembleRrf => "ensemble_rrf",
            Self::Bm25Fallback => "bm25_fallback",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to every result. Fixed fields are always present;
/// `extra` carries provider-specific values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub chunk_id: ChunkId,
    pub document_id: String,
    pub page: Option<u32>,
    pub chunk_index: usize,
    pub retrieval_method: RetrievalMethod,
    pub search_scope: ScopeKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A ranked chunk handed back to callers. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    /// Finite and non-negative; higher is better.
    pub score: f32,
    pub metadata: ResultMetadata,
}

impl SearchResult {
    pub fn from_chunk(
        chunk: &Chunk,
        score: f32,
        method: RetrievalMethod,
        scope: ScopeKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut extra = BTreeMap::new();
        if let Some(source) = &chunk.source_method {
            extra.insert("sourceMethod".to_string(), serde_json::Value::String(source.clone()));
        }
        if let Some(parent) = &chunk.parent_id {
            extra.insert("parentId".to_string(), serde_json::Value::String(parent.clone()));
        }
        Self {
            content: chunk.content.clone(),
            score: sanitize_score(score),
            metadata: ResultMetadata {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                page: chunk.page,
                chunk_index: chunk.chunk_index,
                retrieval_method: method,
                search_scope: scope,
                timestamp,
                lexical_rank: None,
                vector_rank: None,
                rerank_score: None,
                extra,
            },
        }
    }
}

/// Clamp a raw engine score into the finite, non-negative range.
pub fn sanitize_score(score: f32) -> f32 {
    if score.is_finite() && score > 0.0 { score } else { 0.0 }
}

/// A nearest-neighbour hit from a vector store. `score` is a similarity,
/// higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}
