//! Configuration loading.
//!
//! Settings come from an optional TOML file, then from environment
//! variables (a `.env` file in the working directory is honoured). Every
//! option has a default, so the binary runs without any configuration.
//!
//! ```toml
//! [paths]
//! papers_dir = "papers"
//! data_dir = "data"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//!
//! [retrieval]
//! top_k = 5
//! max_context_chars = 12000
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_papers_dir")]
    pub papers_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Defaults to `{data_dir}/papers.json`.
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,
    /// Directory holding the vector index. Defaults to `{data_dir}/index`.
    #[serde(default)]
    pub index_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            papers_dir: default_papers_dir(),
            data_dir: default_data_dir(),
            corpus_path: None,
            index_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn corpus_path(&self) -> PathBuf {
        self.corpus_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("papers.json"))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("index"))
    }
}

fn default_papers_dir() -> PathBuf {
    PathBuf::from("papers")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    /// File-name suffix identifying per-paper content lists.
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: default_min_chunk_chars(),
            source_suffix: default_source_suffix(),
        }
    }
}

fn default_min_chunk_chars() -> usize {
    5
}
fn default_source_suffix() -> String {
    "_content_list.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            batch_size: default_index_batch_size(),
        }
    }
}

fn default_collection() -> String {
    "paper_chunks".to_string()
}
fn default_index_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: None,
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_backoff_ms() -> u64 {
    1500
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            model: default_chat_model(),
            url: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_chat_provider() -> String {
    "openai".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_context_chars() -> usize {
    12000
}

/// Load configuration: TOML file (if it exists), then `.env` and process
/// environment overrides, then validation.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        Config::default()
    };

    dotenvy::dotenv().ok();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without applying overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Empty values are ignored; numeric values that do not parse leave the
/// current setting unchanged.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = get("PAPERS_DIR") {
        config.paths.papers_dir = PathBuf::from(v);
    }
    if let Some(v) = get("DATA_DIR") {
        config.paths.data_dir = PathBuf::from(v);
    }
    if let Some(v) = get("CORPUS_PATH") {
        config.paths.corpus_path = Some(PathBuf::from(v));
    }
    if let Some(v) = get("INDEX_DIR") {
        config.paths.index_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get("INDEX_COLLECTION") {
        config.index.collection = v;
    }
    if let Some(v) = get("EMBEDDING_MODEL") {
        config.embedding.model = v;
    }
    if let Some(v) = get("CHAT_MODEL") {
        config.chat.model = v;
    }
    if let Some(v) = get("TOP_K").and_then(|v| v.parse().ok()) {
        config.retrieval.top_k = v;
    }
    if let Some(v) = get("MAX_CONTEXT_CHARS").and_then(|v| v.parse().ok()) {
        config.retrieval.max_context_chars = v;
    }
    if let Some(v) = get("MIN_CHUNK_CHARS").and_then(|v| v.parse().ok()) {
        config.corpus.min_chunk_chars = v;
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_context_chars == 0 {
        bail!("retrieval.max_context_chars must be > 0");
    }
    if config.index.collection.trim().is_empty() {
        bail!("index.collection must not be empty");
    }
    if config.index.batch_size == 0 {
        bail!("index.batch_size must be > 0");
    }
    if config.corpus.source_suffix.is_empty() {
        bail!("corpus.source_suffix must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    match config.chat.provider.as_str() {
        "openai" | "ollama" => {}
        other => bail!(
            "Unknown chat provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.chat.temperature) {
        bail!("chat.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
