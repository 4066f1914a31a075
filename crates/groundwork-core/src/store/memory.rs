//! In-memory [`VectorStore`] for tests and throwaway runs

use super::{rank, EntryFilter, IndexEntry, QueryHit, VectorStore};
use crate::error::{GroundworkError, Result};
use crate::llm::Embedder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

struct StoredEntry {
    entry: IndexEntry,
    embedding: Vec<f32>,
}

/// Entries kept in a map behind a `RwLock`; lost on drop
pub struct InMemoryVectorStore {
    entries: RwLock<BTreeMap<String, StoredEntry>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            embedder,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> GroundworkError {
    GroundworkError::Store("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, entry: &IndexEntry) -> Result<()> {
        let embedding = self.embedder.embed(&entry.text).await?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(
            entry.id.clone(),
            StoredEntry {
                entry: entry.clone(),
                embedding,
            },
        );
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(ids.iter().filter(|id| entries.remove(*id).is_some()).count())
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<IndexEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(ids
            .iter()
            .filter_map(|id| entries.get(id).map(|s| s.entry.clone()))
            .collect())
    }

    async fn get_where(&self, filter: &EntryFilter) -> Result<Vec<IndexEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .values()
            .filter(|s| filter.matches(&s.entry.metadata))
            .map(|s| s.entry.clone())
            .collect())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(text).await?;
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(rank(
            &query,
            entries
                .values()
                .map(|s| (s.entry.clone(), s.embedding.clone())),
            k,
        ))
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Fingerprint;
    use crate::llm::HashingEmbedder;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(64)))
    }

    fn entry(doc: &str, i: usize, text: &str, source: &str) -> IndexEntry {
        IndexEntry::chunk(
            doc,
            i,
            text.to_string(),
            source,
            Fingerprint {
                mtime: 0.0,
                size: text.len() as u64,
            },
        )
    }

    #[tokio::test]
    async fn test_add_get_delete() {
        let store = store();
        store.add(&entry("a", 0, "first", "a.md")).await.unwrap();
        store.add(&entry("a", 1, "second", "a.md")).await.unwrap();
        store.add(&entry("b", 0, "other", "b.md")).await.unwrap();
        assert_eq!(store.len(), 3);

        let got = store
            .get(&["a_1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "second");

        let from_a = store
            .get_where(&EntryFilter::Source("a.md".into()))
            .await
            .unwrap();
        assert_eq!(from_a.len(), 2);

        let removed = store
            .delete(&["a_0".to_string(), "a_1".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get_where(&EntryFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_replaces_same_id() {
        let store = store();
        store.add(&entry("a", 0, "old", "a.md")).await.unwrap();
        store.add(&entry("a", 0, "new", "a.md")).await.unwrap();
        let all = store.get_where(&EntryFilter::All).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "new");
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let store = store();
        store
            .add(&entry("r", 0, "router bgp session flapping", "r.md"))
            .await
            .unwrap();
        store
            .add(&entry("p", 0, "printer paper tray jammed", "p.md"))
            .await
            .unwrap();

        let hits = store.query("bgp session", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.metadata.source, "r.md");

        assert!(store.query("bgp", 0).await.unwrap().is_empty());
    }
}
