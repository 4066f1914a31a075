//! HTTP embedder for Ollama and OpenAI-compatible services

use super::Embedder;
use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{GroundworkError, Result};
use crate::retry::{status_error, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wire protocol spoken by the embedding service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingApi {
    /// `POST /api/embed`
    Ollama,
    /// `POST /v1/embeddings`
    OpenAi,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbedResponse {
    fn into_vectors(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

/// Embedder backed by a remote HTTP service
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    api: EmbeddingApi,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: AtomicUsize,
    retry: RetryPolicy,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: &EmbeddingConfig, retry: RetryPolicy) -> Result<Self> {
        let api = match config.provider {
            EmbeddingProvider::Ollama => EmbeddingApi::Ollama,
            EmbeddingProvider::OpenAi => EmbeddingApi::OpenAi,
            other => {
                return Err(GroundworkError::Config(format!(
                    "provider {:?} is not an HTTP embedding service",
                    other
                )))
            }
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            api,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimensions: AtomicUsize::new(config.dimensions.unwrap_or(0)),
            retry,
        })
    }

    fn endpoint(&self) -> String {
        match self.api {
            EmbeddingApi::Ollama => format!("{}/api/embed", self.url),
            EmbeddingApi::OpenAi => format!("{}/v1/embeddings", self.url),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let mut req = self.http_client.post(self.endpoint()).json(&body);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let vectors = match self.api {
            EmbeddingApi::Ollama => response.json::<OllamaEmbedResponse>().await?.embeddings,
            EmbeddingApi::OpenAi => response.json::<OpenAiEmbedResponse>().await?.into_vectors(),
        };

        if vectors.len() != texts.len() {
            return Err(GroundworkError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| GroundworkError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .retry
            .run("embedding request", || self.request(texts))
            .await?;

        if let Some(first) = vectors.first() {
            let _ = self.dimensions.compare_exchange(
                0,
                first.len(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions.load(Ordering::Relaxed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(provider: EmbeddingProvider, url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider,
            url: url.to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: None,
            api_key: None,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_endpoints() {
        let ollama = HttpEmbedder::from_config(
            &config(EmbeddingProvider::Ollama, "http://localhost:11434/"),
            RetryPolicy::none(),
        )
        .unwrap();
        assert_eq!(ollama.endpoint(), "http://localhost:11434/api/embed");

        let openai = HttpEmbedder::from_config(
            &config(EmbeddingProvider::OpenAi, "http://localhost:8000"),
            RetryPolicy::none(),
        )
        .unwrap();
        assert_eq!(openai.endpoint(), "http://localhost:8000/v1/embeddings");
    }

    #[test]
    fn test_rejects_offline_provider() {
        let result = HttpEmbedder::from_config(
            &config(EmbeddingProvider::Hashing, "http://localhost:11434"),
            RetryPolicy::none(),
        );
        assert!(matches!(result, Err(GroundworkError::Config(_))));
    }

    #[test]
    fn test_parse_ollama_response() {
        let body = r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
        let parsed: OllamaEmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.embeddings, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_openai_response_orders_by_index() {
        let body = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[2.0]},
            {"object":"embedding","index":0,"embedding":[1.0]}
        ]}"#;
        let parsed: OpenAiEmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient_error() {
        let embedder = HttpEmbedder::from_config(
            &config(EmbeddingProvider::Ollama, "http://127.0.0.1:1"),
            RetryPolicy::new(2, Duration::ZERO),
        )
        .unwrap();

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(embedder.dimensions(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = HttpEmbedder::from_config(
            &config(EmbeddingProvider::Ollama, "http://127.0.0.1:1"),
            RetryPolicy::none(),
        )
        .unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
