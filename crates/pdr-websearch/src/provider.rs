//! Web search provider seam and its HTTP implementation.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pdr_core::config::WebSearchSettings;
use pdr_core::{Error, Result};

use crate::types::{PlannedQuery, QueryCategory, RetrievedWebResult};

/// Runs one planned query against a web search backend. Every error is
/// treated as retryable by the executor.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &PlannedQuery) -> impl Future<Output = Result<Vec<RetrievedWebResult>>> + Send;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<usize>,
    topic: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Deserialize)]
struct RawResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
    score: Option<f32>,
}

/// JSON-over-HTTP search API (Tavily-style request and response shape).
pub struct HttpSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: Option<usize>,
}

impl HttpSearchProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, max_results: Option<usize>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pdr-websearch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into(), api_key: api_key.filter(|k| !k.is_empty()), max_results })
    }

    pub fn from_settings(settings: &WebSearchSettings) -> Result<Self> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.max_results,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &PlannedQuery) -> Result<Vec<RetrievedWebResult>> {
        let body = SearchRequest { query: query.search_query(), max_results: self.max_results, topic: search_topic(query.category()) };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() { Error::Timeout(format!("{}: {e}", self.endpoint)) } else { Error::Http(format!("{}: {e}", self.endpoint)) }
        })?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Provider { status: status.as_u16(), message: text.chars().take(200).collect() });
        }
        let text = resp.text().await.map_err(|e| Error::Http(format!("{}: {e}", self.endpoint)))?;
        decode_results(&text)
    }
}

/// Provider topic for a plan category. The search API only knows `general`,
/// `news` and `finance`.
pub fn search_topic(category: QueryCategory) -> &'static str {
    match category {
        QueryCategory::Finance => "finance",
        QueryCategory::Fashion | QueryCategory::Business | QueryCategory::Tech => "general",
    }
}

/// Decode a provider reply. A missing `results` field is an empty list;
/// entries without a URL are skipped.
pub fn decode_results(body: &str) -> Result<Vec<RetrievedWebResult>> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| Error::Decode(format!("search response: {e}")))?;
    Ok(parsed
        .results
        .into_iter()
        .filter_map(|r| {
            let url = r.url.filter(|u| !u.is_empty())?;
            Some(RetrievedWebResult { url, title: r.title, content: r.content, score: r.score })
        })
        .collect())
}
