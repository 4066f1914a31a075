//! Configuration management

use crate::error::{GroundworkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Document corpus location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Root directory of the documents to index
    #[serde(default = "default_docs_dir")]
    pub root: PathBuf,

    /// Tracking file name, relative to the corpus root
    #[serde(default = "default_tracking_file")]
    pub tracking_file: String,

    #[serde(default = "default_true")]
    pub follow_symlinks: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_docs_dir(),
            tracking_file: default_tracking_file(),
            follow_symlinks: true,
        }
    }
}

impl CorpusConfig {
    /// Absolute location of the tracking file
    pub fn tracking_path(&self) -> PathBuf {
        self.root.join(&self.tracking_file)
    }
}

fn default_docs_dir() -> PathBuf {
    std::env::var("GROUNDWORK_DOCS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./network_docs"))
}

fn default_tracking_file() -> String {
    ".doc_tracking.json".to_string()
}

fn default_true() -> bool {
    true
}

/// Vector store persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file holding index entries and their embeddings
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    std::env::var("GROUNDWORK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::CACHE_DIR_NAME)
                .join("index.sqlite")
        })
}

/// Chunking parameters, measured in characters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    crate::index::DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    crate::index::DEFAULT_CHUNK_OVERLAP
}

/// Retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages assembled into the context block
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
    5
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Ollama `/api/embed`
    Ollama,
    /// OpenAI-compatible `/v1/embeddings`
    OpenAi,
    /// Offline feature hashing, no network
    Hashing,
    /// No embeddings; vector search is unavailable
    Disabled,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Base URL of the embedding service
    #[serde(default = "default_ollama_host")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensions (used by the hashing embedder; auto-detected otherwise)
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// API key for authenticated services
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            url: default_ollama_host(),
            model: default_embedding_model(),
            dimensions: None,
            api_key: std::env::var("GROUNDWORK_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Ollama
}

fn default_ollama_host() -> String {
    std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("GROUNDWORK_EMBEDDING_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string())
}

fn default_timeout() -> u64 {
    30
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_ollama_host")]
    pub url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum response length in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_host(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_generation_model() -> String {
    std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string())
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_generation_timeout() -> u64 {
    120
}

/// Retry policy applied to every outbound model call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

/// Conversation store bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions idle longer than this are dropped
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    /// Maximum messages kept per transcript (oldest dropped first)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_ttl_secs: default_idle_ttl(),
            max_messages: default_max_messages(),
        }
    }
}

fn default_max_sessions() -> usize {
    256
}

fn default_idle_ttl() -> u64 {
    3600
}

fn default_max_messages() -> usize {
    50
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load and validate config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yaml")
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(GroundworkError::Config(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(GroundworkError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(GroundworkError::Config(
                "retrieval.top_k must be >= 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(GroundworkError::Config(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.embedding.provider == EmbeddingProvider::Hashing
            && self.embedding.dimensions == Some(0)
        {
            return Err(GroundworkError::Config(
                "embedding.dimensions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
