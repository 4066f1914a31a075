//! Ollama text generation client

use super::Generator;
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::retry::{status_error, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Generator using Ollama's `/api/generate`
pub struct OllamaGenerator {
    http_client: reqwest::Client,
    url: String,
    model: String,
    options: GenerateOptions,
    retry: RetryPolicy,
}

impl OllamaGenerator {
    /// Create from configuration
    pub fn from_config(config: &GenerationConfig, retry: RetryPolicy) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
            retry,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", self.url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Generating with {} ({} prompt chars)", self.model, prompt.len());
        self.retry
            .run("generation request", || self.request(prompt))
            .await
    }

    async fn check_connection(&self) -> Result<Vec<String>> {
        self.retry.run("model listing", || self.list_models()).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> GenerationConfig {
        GenerationConfig {
            url: url.to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            model: "llama3.2",
            prompt: "hi",
            stream: false,
            options: GenerateOptions {
                temperature: 0.5,
                num_predict: 2048,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 2048);
        assert_eq!(json["options"]["temperature"], 0.5);
    }

    #[test]
    fn test_parse_responses() {
        let generated: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama3.2","response":"Check the cable.","done":true}"#)
                .unwrap();
        assert_eq!(generated.response, "Check the cable.");

        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"llama3.2:latest","size":1},{"name":"nomic-embed-text:latest"}]}"#,
        )
        .unwrap();
        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3.2:latest", "nomic-embed-text:latest"]);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let generator =
            OllamaGenerator::from_config(&config("http://127.0.0.1:1/"), RetryPolicy::none())
                .unwrap();
        assert_eq!(generator.model_name(), "llama3.2");
        assert!(generator.generate("hello").await.is_err());
        assert!(generator.check_connection().await.is_err());
    }
}
