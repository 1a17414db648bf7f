use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::index::SimilarityMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Remote vector index connection settings. The API key itself never lives
/// in the config file; `api_key_env` names the environment variable that
/// holds it.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub metric: SimilarityMetric,
    #[serde(default = "default_upsert_timeout_secs")]
    pub upsert_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "RECALL_INDEX_API_KEY".to_string()
}
fn default_upsert_timeout_secs() -> u64 {
    30
}
fn default_query_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the dimension the model name implies. Required for models
    /// this build does not know the dimensions of.
    #[serde(default)]
    pub dims: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dims: None,
        }
    }
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    crate::retriever::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate index
    if config.index.name.trim().is_empty() {
        anyhow::bail!("index.name must not be empty");
    }
    if config.index.endpoint.trim().is_empty() {
        anyhow::bail!("index.endpoint must not be empty");
    }
    if config.index.api_key_env.trim().is_empty() {
        anyhow::bail!("index.api_key_env must not be empty");
    }
    if config.index.upsert_timeout_secs == 0 {
        anyhow::bail!("index.upsert_timeout_secs must be > 0");
    }
    if config.index.query_timeout_secs == 0 {
        anyhow::bail!("index.query_timeout_secs must be > 0");
    }

    // Validate embedding
    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    Ok(config)
}
