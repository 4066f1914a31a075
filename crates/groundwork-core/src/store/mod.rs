//! Vector store for index entries
//!
//! Entries carry their text, provenance and the fingerprint of the file they
//! were built from. Similarity is brute-force cosine over stored embeddings.

mod memory;
mod sqlite;
mod unavailable;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;
pub use unavailable::UnavailableStore;

use crate::config::{Config, EmbeddingProvider};
use crate::error::Result;
use crate::index::Fingerprint;
use crate::llm::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an entry was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// One chunk of a plain-text document
    Chunk,
    /// A whole structured-config document
    Config,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Config => "config",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chunk" => Some(Self::Chunk),
            "config" => Some(Self::Config),
            _ => None,
        }
    }
}

/// Provenance of an index entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Canonical relative path of the source document
    pub source: String,
    pub chunk_index: Option<usize>,
    pub fingerprint: Fingerprint,
    pub kind: EntryKind,
}

/// Unit stored in the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Entry for chunk `index` of a plain-text document
    pub fn chunk(
        document_id: &str,
        index: usize,
        text: String,
        source: &str,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            id: format!("{}_{}", document_id, index),
            text,
            metadata: EntryMetadata {
                source: source.to_string(),
                chunk_index: Some(index),
                fingerprint,
                kind: EntryKind::Chunk,
            },
        }
    }

    /// Single entry for a structured-config document
    pub fn config(document_id: &str, text: String, source: &str, fingerprint: Fingerprint) -> Self {
        Self {
            id: document_id.to_string(),
            text,
            metadata: EntryMetadata {
                source: source.to_string(),
                chunk_index: None,
                fingerprint,
                kind: EntryKind::Config,
            },
        }
    }
}

/// Metadata predicate for [`VectorStore::get_where`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryFilter {
    All,
    Source(String),
}

impl EntryFilter {
    pub fn matches(&self, metadata: &EntryMetadata) -> bool {
        match self {
            Self::All => true,
            Self::Source(source) => metadata.source == *source,
        }
    }
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub entry: IndexEntry,
    /// `1 - cosine similarity`; lower is closer
    pub distance: f32,
}

/// Capability the indexing pipeline needs from a vector backend
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert an entry, replacing any entry with the same id
    async fn add(&self, entry: &IndexEntry) -> Result<()>;

    /// Delete entries by id; returns how many existed
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Fetch entries by id; unknown ids are ignored
    async fn get(&self, ids: &[String]) -> Result<Vec<IndexEntry>>;

    /// Fetch every entry whose metadata matches `filter`
    async fn get_where(&self, filter: &EntryFilter) -> Result<Vec<IndexEntry>>;

    /// Top `k` entries by ascending distance to `text`
    async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>>;

    /// Whether the backend can serve requests at all
    fn is_available(&self) -> bool;
}

/// Open the store described by `config`.
///
/// Falls back to [`UnavailableStore`] when embeddings are disabled or the
/// database cannot be opened, so callers degrade instead of failing.
pub fn open_store(config: &Config, embedder: Arc<dyn Embedder>) -> Arc<dyn VectorStore> {
    if config.embedding.provider == EmbeddingProvider::Disabled {
        return Arc::new(UnavailableStore::new("embeddings are disabled"));
    }
    match SqliteVectorStore::open(&config.store.path, embedder) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "Vector store at {} unavailable: {}",
                config.store.path.display(),
                e
            );
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    }
}

/// Convert f32 embedding to little-endian bytes
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank `(entry, embedding)` pairs against `query` and keep the best `k`.
/// Ties break on entry id so results are stable.
pub(crate) fn rank<I>(query: &[f32], candidates: I, k: usize) -> Vec<QueryHit>
where
    I: IntoIterator<Item = (IndexEntry, Vec<f32>)>,
{
    let mut hits: Vec<QueryHit> = candidates
        .into_iter()
        .map(|(entry, embedding)| QueryHit {
            distance: 1.0 - cosine_similarity(query, &embedding),
            entry,
        })
        .collect();

    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprint {
        Fingerprint {
            mtime: 1.0,
            size: 10,
        }
    }

    #[test]
    fn test_entry_ids() {
        let chunk = IndexEntry::chunk("abc", 2, "text".into(), "a.md", fp());
        assert_eq!(chunk.id, "abc_2");
        assert_eq!(chunk.metadata.chunk_index, Some(2));
        assert_eq!(chunk.metadata.kind, EntryKind::Chunk);

        let config = IndexEntry::config("def", "{}".into(), "b.yaml", fp());
        assert_eq!(config.id, "def");
        assert_eq!(config.metadata.chunk_index, None);
        assert_eq!(config.metadata.kind, EntryKind::Config);
    }

    #[test]
    fn test_filter_matches() {
        let entry = IndexEntry::chunk("abc", 0, "t".into(), "sub/a.md", fp());
        assert!(EntryFilter::All.matches(&entry.metadata));
        assert!(EntryFilter::Source("sub/a.md".into()).matches(&entry.metadata));
        assert!(!EntryFilter::Source("a.md".into()).matches(&entry.metadata));
    }

    #[test]
    fn test_embedding_bytes() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let near = IndexEntry::chunk("n", 0, "near".into(), "n.md", fp());
        let far = IndexEntry::chunk("f", 0, "far".into(), "f.md", fp());
        let mid = IndexEntry::chunk("m", 0, "mid".into(), "m.md", fp());

        let hits = rank(
            &[1.0, 0.0],
            vec![
                (far, vec![0.0, 1.0]),
                (near, vec![1.0, 0.0]),
                (mid, vec![1.0, 1.0]),
            ],
            2,
        );
        let ids: Vec<&str> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["n_0", "m_0"]);
        assert!(hits[0].distance <= hits[1].distance);
    }
}
