//! Embedding and generation backends

mod http_embedder;
mod offline;
mod ollama;
mod traits;

pub use http_embedder::{EmbeddingApi, HttpEmbedder};
pub use offline::{DisabledEmbedder, HashingEmbedder, DEFAULT_HASHING_DIMENSIONS};
pub use ollama::OllamaGenerator;
pub use traits::{model_is_available, Embedder, Generator};

use crate::config::{Config, EmbeddingProvider};
use crate::error::Result;
use crate::retry::RetryPolicy;
use std::sync::Arc;

/// Build the embedder selected by `config.embedding.provider`
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let retry = RetryPolicy::from_config(&config.retry);
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::Ollama | EmbeddingProvider::OpenAi => {
            Arc::new(HttpEmbedder::from_config(&config.embedding, retry)?)
        }
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(
            config
                .embedding
                .dimensions
                .unwrap_or(DEFAULT_HASHING_DIMENSIONS),
        )),
        EmbeddingProvider::Disabled => Arc::new(DisabledEmbedder),
    };
    tracing::debug!("Using embedder {}", embedder.model_name());
    Ok(embedder)
}

/// Build the generation client
pub fn create_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let retry = RetryPolicy::from_config(&config.retry);
    Ok(Arc::new(OllamaGenerator::from_config(
        &config.generation,
        retry,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_embedder_by_provider() {
        let mut config = Config::default();

        config.embedding.provider = EmbeddingProvider::Hashing;
        config.embedding.dimensions = Some(32);
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimensions(), 32);
        assert_eq!(embedder.model_name(), "hashing-32");

        config.embedding.provider = EmbeddingProvider::Disabled;
        assert_eq!(create_embedder(&config).unwrap().model_name(), "disabled");

        config.embedding.provider = EmbeddingProvider::Ollama;
        config.embedding.model = "nomic-embed-text".to_string();
        assert_eq!(
            create_embedder(&config).unwrap().model_name(),
            "nomic-embed-text"
        );
    }
}
