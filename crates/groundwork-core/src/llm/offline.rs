//! Embedders that need no network

use super::Embedder;
use crate::error::{GroundworkError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Default vector width for [`HashingEmbedder`]
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Feature-hashing bag-of-words embedder.
///
/// Each lowercase token is hashed into one of `dimensions` buckets with a
/// hash-derived sign, and the result is L2-normalized. Texts sharing
/// vocabulary land close together, which is enough for offline runs and
/// tests.
pub struct HashingEmbedder {
    dimensions: usize,
    model: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("hashing-{}", dimensions),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in TOKEN.find_iter(text) {
            let digest = Sha256::digest(token.as_str().to_lowercase().as_bytes());
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[..8]);
            let hash = u64::from_le_bytes(word);

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Stand-in when embeddings are switched off; every call fails
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(GroundworkError::Embedding(
            "embeddings are disabled".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(GroundworkError::Embedding(
            "embeddings are disabled".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    #[tokio::test]
    async fn test_hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("VLAN trunk configuration").await.unwrap();
        let b = embedder.embed("vlan TRUNK configuration").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("ospf neighbor stuck").await.unwrap();
        let related = embedder
            .embed("Troubleshooting an OSPF neighbor stuck in EXSTART")
            .await
            .unwrap();
        let unrelated = embedder
            .embed("Printer toner replacement schedule")
            .await
            .unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed("  ").await.unwrap(), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn test_disabled_always_fails() {
        assert!(DisabledEmbedder.embed("x").await.is_err());
        assert!(DisabledEmbedder.embed_batch(&["x".to_string()]).await.is_err());
    }
}
