//! Planned sub-queries and the web results they produce.

use std::fmt;

use serde::{Deserialize, Serialize};

use pdr_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Fashion,
    Finance,
    Business,
    Tech,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fashion => "fashion",
            Self::Finance => "finance",
            Self::Business => "business",
            Self::Tech => "tech",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One sub-query from a research plan. Query text and rationale are never
/// blank; both the constructor and the deserializer enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPlannedQuery")]
pub struct PlannedQuery {
    search_query: String,
    category: QueryCategory,
    rationale: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlannedQuery {
    search_query: String,
    category: QueryCategory,
    rationale: String,
}

impl PlannedQuery {
    pub fn new(search_query: impl Into<String>, category: QueryCategory, rationale: impl Into<String>) -> Result<Self> {
        let search_query = search_query.into();
        let rationale = rationale.into();
        if search_query.trim().is_empty() {
            return Err(Error::InvalidInput("searchQuery must not be empty".into()));
        }
        if rationale.trim().is_empty() {
            return Err(Error::InvalidInput("rationale must not be empty".into()));
        }
        Ok(Self { search_query, category, rationale })
    }

    pub fn search_query(&self) -> &str { &self.search_query }

    pub fn category(&self) -> QueryCategory { self.category }

    pub fn rationale(&self) -> &str { &self.rationale }
}

impl TryFrom<RawPlannedQuery> for PlannedQuery {
    type Error = Error;

    fn try_from(raw: RawPlannedQuery) -> Result<Self> { Self::new(raw.search_query, raw.category, raw.rationale) }
}

/// A single hit returned by the web search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedWebResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl RetrievedWebResult {
    pub fn new(url: impl Into<String>) -> Self { Self { url: url.into(), title: None, content: None, score: None } }
}
