//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__RRF_K=40`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Build from an explicit figment; used by tests and embedders of the crate.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            let provider: String = self.get("embedding.provider")?;
            if provider == "hash" {
                anyhow::bail!("embedding.provider = \"hash\" is not allowed in production");
            }
        }
        Ok(())
    }
}

/// Typed view over every configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
    pub web_search: WebSearchSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.retrieval.validate()?;
        if self.web_search.max_attempts == 0 {
            anyhow::bail!("web_search.max_attempts must be at least 1");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub lancedb_dir: String,
    pub chunk_table: String,
    pub embedding_dim: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { lancedb_dir: "./data/lancedb".to_string(), chunk_table: "chunks".to_string(), embedding_dim: 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub document_top_k: usize,
    pub company_top_k: usize,
    pub multi_document_top_k: usize,
    /// `[lexical, vector]` fusion weights.
    pub weights: [f32; 2],
    pub rrf_k: f32,
    /// Caller-level deadline for one ensemble search, in seconds.
    pub timeout_secs: u64,
}

impl RetrievalSettings {
    /// Positive top-k defaults, a finite non-negative `rrf_k`, and usable weights.
    pub fn validate(&self) -> crate::Result<()> {
        if self.document_top_k == 0 || self.company_top_k == 0 || self.multi_document_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval top_k defaults must be at least 1".into()));
        }
        if !(self.rrf_k.is_finite() && self.rrf_k >= 0.0) {
            return Err(Error::InvalidConfig(format!("retrieval.rrf_k must be finite and non-negative, got {}", self.rrf_k)));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) || self.weights.iter().sum::<f32>() <= 0.0 {
            return Err(Error::InvalidConfig("retrieval.weights must be non-negative and not all zero".into()));
        }
        Ok(())
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { document_top_k: 8, company_top_k: 10, multi_document_top_k: 10, weights: [0.4, 0.6], rrf_k: 60.0, timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `sidecar` or `hash`.
    pub provider: String,
    pub sidecar_url: String,
    pub model: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "sidecar".to_string(),
            sidecar_url: "http://127.0.0.1:8000".to_string(),
            model: "BAAI/bge-large-en-v1.5".to_string(),
            batch_size: 64,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub enabled: bool,
    pub sidecar_url: String,
    pub timeout_secs: u64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { enabled: false, sidecar_url: "http://127.0.0.1:8000".to_string(), timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    /// Per provider call.
    pub timeout_secs: u64,
    pub max_results: Option<usize>,
    /// Caller-level deadline for a whole batch.
    pub batch_timeout_secs: u64,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key: None,
            max_attempts: 3,
            retry_delay_ms: 250,
            timeout_secs: 15,
            max_results: Some(5),
            batch_timeout_secs: 60,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
