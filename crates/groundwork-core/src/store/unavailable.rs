//! Placeholder store used when no vector backend can be reached

use super::{EntryFilter, IndexEntry, QueryHit, VectorStore};
use crate::error::{GroundworkError, Result};
use async_trait::async_trait;

/// Reports itself unavailable and fails every operation
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn err(&self) -> GroundworkError {
        GroundworkError::Unavailable(self.reason.clone())
    }
}

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn add(&self, _entry: &IndexEntry) -> Result<()> {
        Err(self.err())
    }

    async fn delete(&self, _ids: &[String]) -> Result<usize> {
        Err(self.err())
    }

    async fn get(&self, _ids: &[String]) -> Result<Vec<IndexEntry>> {
        Err(self.err())
    }

    async fn get_where(&self, _filter: &EntryFilter) -> Result<Vec<IndexEntry>> {
        Err(self.err())
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<QueryHit>> {
        Err(self.err())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_fails() {
        let store = UnavailableStore::new("no backend");
        assert!(!store.is_available());
        assert_eq!(store.reason(), "no backend");
        assert!(matches!(
            store.query("x", 3).await,
            Err(GroundworkError::Unavailable(_))
        ));
        assert!(store.get_where(&EntryFilter::All).await.is_err());
        assert!(store.delete(&["a".to_string()]).await.is_err());
    }
}
