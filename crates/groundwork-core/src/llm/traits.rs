//! Model backend traits

use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimensions, 0 when not yet known
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Text generation trait
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Probe the service and list the models it serves
    async fn check_connection(&self) -> Result<Vec<String>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Whether `model` is among `available`, ignoring case and any `:tag` suffix
pub fn model_is_available(available: &[String], model: &str) -> bool {
    let wanted = base_model_name(model);
    available.iter().any(|name| base_model_name(name) == wanted)
}

fn base_model_name(name: &str) -> String {
    name.split(':').next().unwrap_or(name).to_lowercase()
}
