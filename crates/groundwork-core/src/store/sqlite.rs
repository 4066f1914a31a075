//! SQLite-backed [`VectorStore`]
//!
//! Embeddings are stored as little-endian f32 BLOBs next to the entry text
//! and metadata. Queries load every embedding and rank them in Rust.

use super::{
    bytes_to_embedding, embedding_to_bytes, rank, EntryFilter, EntryKind, EntryMetadata,
    IndexEntry, QueryHit, VectorStore,
};
use crate::error::{GroundworkError, Result};
use crate::index::Fingerprint;
use crate::llm::Embedder;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    chunk_index INTEGER,
    kind TEXT NOT NULL,
    mtime REAL NOT NULL,
    size INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    model TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

const ENTRY_COLUMNS: &str = "id, source, chunk_index, kind, mtime, size, text";

/// Persistent vector store in a single SQLite file
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::initialize(conn, embedder)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?, embedder)
    }

    fn initialize(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(CREATE_TABLES)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| GroundworkError::Store("database lock poisoned".to_string()))
    }

    /// Number of stored entries
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
    let kind: String = row.get(3)?;
    let kind = EntryKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown entry kind '{}'", kind).into(),
        )
    })?;
    let chunk_index: Option<i64> = row.get(2)?;
    let size: i64 = row.get(5)?;

    Ok(IndexEntry {
        id: row.get(0)?,
        text: row.get(6)?,
        metadata: EntryMetadata {
            source: row.get(1)?,
            chunk_index: chunk_index.map(|i| i as usize),
            fingerprint: Fingerprint {
                mtime: row.get(4)?,
                size: size as u64,
            },
            kind,
        },
    })
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(&self, entry: &IndexEntry) -> Result<()> {
        // Embed first; the connection lock is never held across an await
        let embedding = self.embedder.embed(&entry.text).await?;
        let embedding_bytes = embedding_to_bytes(&embedding);
        let now = Utc::now().to_rfc3339();
        let meta = &entry.metadata;

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO entries
                (id, source, chunk_index, kind, mtime, size, text, embedding, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id,
                meta.source,
                meta.chunk_index.map(|i| i as i64),
                meta.kind.as_str(),
                meta.fingerprint.mtime,
                meta.fingerprint.size as i64,
                entry.text,
                embedding_bytes,
                self.embedder.model_name(),
                now
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;

        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            let mut removed = 0;
            for id in ids {
                removed += conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
            }
            Ok(removed)
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<IndexEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM entries WHERE id IN ({}) ORDER BY id",
            ENTRY_COLUMNS,
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(ids.iter()), row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn get_where(&self, filter: &EntryFilter) -> Result<Vec<IndexEntry>> {
        let conn = self.conn()?;
        let entries = match filter {
            EntryFilter::All => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM entries ORDER BY source, id",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], row_to_entry)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            EntryFilter::Source(source) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM entries WHERE source = ?1 ORDER BY id",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![source], row_to_entry)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(entries)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(text).await?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, embedding FROM entries",
            ENTRY_COLUMNS
        ))?;
        let candidates = stmt
            .query_map([], |row| {
                let entry = row_to_entry(row)?;
                let bytes: Vec<u8> = row.get(7)?;
                Ok((entry, bytes_to_embedding(&bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rank(&query, candidates, k))
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;
    use tempfile::TempDir;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashingEmbedder::new(64))
    }

    fn fp(size: u64) -> Fingerprint {
        Fingerprint {
            mtime: 1700000000.5,
            size,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_metadata() {
        let store = SqliteVectorStore::open_in_memory(embedder()).unwrap();
        let chunk = IndexEntry::chunk("doc", 3, "interface down".into(), "sub/a.md", fp(14));
        let config = IndexEntry::config("cfg", "{\"a\": 1}".into(), "b.yaml", fp(5));
        store.add(&chunk).await.unwrap();
        store.add(&config).await.unwrap();

        let got = store
            .get(&["doc_3".to_string(), "cfg".to_string()])
            .await
            .unwrap();
        assert_eq!(got, vec![config.clone(), chunk.clone()]);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_where_and_delete() {
        let store = SqliteVectorStore::open_in_memory(embedder()).unwrap();
        for i in 0..3 {
            store
                .add(&IndexEntry::chunk("a", i, format!("part {}", i), "a.md", fp(1)))
                .await
                .unwrap();
        }
        store
            .add(&IndexEntry::chunk("b", 0, "other".into(), "b.md", fp(1)))
            .await
            .unwrap();

        let a = store
            .get_where(&EntryFilter::Source("a.md".into()))
            .await
            .unwrap();
        assert_eq!(a.len(), 3);

        let ids: Vec<String> = a.iter().map(|e| e.id.clone()).collect();
        assert_eq!(store.delete(&ids).await.unwrap(), 3);
        assert_eq!(store.get_where(&EntryFilter::All).await.unwrap().len(), 1);
        assert_eq!(store.delete(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_returns_nearest() {
        let store = SqliteVectorStore::open_in_memory(embedder()).unwrap();
        store
            .add(&IndexEntry::chunk("d", 0, "dns resolution fails intermittently".into(), "dns.md", fp(1)))
            .await
            .unwrap();
        store
            .add(&IndexEntry::chunk("w", 0, "wifi roaming between access points".into(), "wifi.md", fp(1)))
            .await
            .unwrap();

        let hits = store.query("dns resolution", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.metadata.source, "dns.md");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache/index.sqlite");
        {
            let store = SqliteVectorStore::open(&path, embedder()).unwrap();
            store
                .add(&IndexEntry::config("cfg", "{}".into(), "net.yaml", fp(2)))
                .await
                .unwrap();
        }
        let store = SqliteVectorStore::open(&path, embedder()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
