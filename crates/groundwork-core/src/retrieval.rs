//! Context assembly for grounded generation

use crate::store::{QueryHit, VectorStore};
use std::path::Path;
use std::sync::Arc;

/// Turns a user query into a block of attributed passages
#[derive(Clone)]
pub struct ContextBuilder {
    store: Arc<dyn VectorStore>,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Top `k` hits for `query`, or nothing when search is impossible
    pub async fn search(&self, query: &str, k: usize) -> Vec<QueryHit> {
        if k == 0 || query.trim().is_empty() || !self.store.is_available() {
            return Vec::new();
        }
        match self.store.query(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Context query failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Concatenated passages in ranking order, each headed by its file name.
    /// Empty when there is nothing to ground on.
    pub async fn build_context(&self, query: &str, k: usize) -> String {
        format_context(&self.search(query, k).await)
    }
}

/// Render hits as `--- From <file> ---` sections
pub fn format_context(hits: &[QueryHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "\n--- From {} ---\n{}\n",
                display_name(&hit.entry.metadata.source),
                hit.entry.text
            )
        })
        .collect()
}

fn display_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Fingerprint;
    use crate::llm::HashingEmbedder;
    use crate::store::{IndexEntry, InMemoryVectorStore, UnavailableStore};

    fn fp() -> Fingerprint {
        Fingerprint {
            mtime: 0.0,
            size: 1,
        }
    }

    async fn populated() -> ContextBuilder {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(128)));
        store
            .add(&IndexEntry::chunk(
                "a",
                0,
                "Reset the switch port with shutdown then no shutdown.".into(),
                "guides/switch.md",
                fp(),
            ))
            .await
            .unwrap();
        store
            .add(&IndexEntry::config(
                "b",
                "{\n  \"ntp\": \"10.0.0.1\"\n}".into(),
                "ntp.yaml",
                fp(),
            ))
            .await
            .unwrap();
        ContextBuilder::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_context_format_and_order() {
        let builder = populated().await;
        let context = builder.build_context("switch port shutdown", 1).await;
        assert_eq!(
            context,
            "\n--- From switch.md ---\nReset the switch port with shutdown then no shutdown.\n"
        );

        let both = builder.build_context("switch port shutdown", 5).await;
        assert!(both.starts_with("\n--- From switch.md ---\n"));
        assert!(both.contains("\n--- From ntp.yaml ---\n"));
    }

    #[tokio::test]
    async fn test_empty_cases() {
        let builder = populated().await;
        assert_eq!(builder.build_context("switch", 0).await, "");
        assert_eq!(builder.build_context("   ", 3).await, "");

        let empty = ContextBuilder::new(Arc::new(InMemoryVectorStore::new(Arc::new(
            HashingEmbedder::default(),
        ))));
        assert_eq!(empty.build_context("anything", 5).await, "");

        let unavailable = ContextBuilder::new(Arc::new(UnavailableStore::new("down")));
        assert_eq!(unavailable.build_context("anything", 5).await, "");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("a/b/c.md"), "c.md");
        assert_eq!(display_name("top.yaml"), "top.yaml");
    }
}
