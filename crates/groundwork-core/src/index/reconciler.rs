//! Incremental reconciliation of the corpus against the vector store

use super::chunker::chunk_text;
use super::scanner::{
    normalize_source, scan_corpus, ContentType, Fingerprint, ScanOptions, ScannedDocument,
};
use super::tracking::{TrackingMap, TrackingRecord, TrackingStore};
use crate::config::{ChunkingConfig, Config};
use crate::error::{GroundworkError, Result};
use crate::store::{EntryFilter, IndexEntry, VectorStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-document classification, relative paths sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStatus {
    pub indexed: Vec<String>,
    pub unindexed: Vec<String>,
    pub modified: Vec<String>,
    /// Sources with index entries but no file on disk
    pub missing: Vec<String>,
}

impl DocumentStatus {
    pub fn needs_indexing(&self) -> bool {
        !self.unindexed.is_empty() || !self.modified.is_empty() || !self.missing.is_empty()
    }
}

/// Whether a reindex pass ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexOutcome {
    Completed,
    /// The vector store could not be used; nothing was touched
    Unavailable,
}

/// Counts from one reindex pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub outcome: ReindexOutcome,
    pub indexed_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub removed_count: usize,
}

impl ReindexReport {
    fn new(outcome: ReindexOutcome) -> Self {
        Self {
            outcome,
            indexed_count: 0,
            updated_count: 0,
            skipped_count: 0,
            removed_count: 0,
        }
    }

    /// True when the pass changed nothing
    pub fn is_noop(&self) -> bool {
        self.indexed_count == 0
            && self.updated_count == 0
            && self.skipped_count == 0
            && self.removed_count == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Indexed,
    Unindexed,
    Modified,
}

/// Everything one classification pass learned
struct Snapshot {
    documents: Vec<ScannedDocument>,
    states: BTreeMap<String, State>,
    status: DocumentStatus,
    /// Tracking map to persist for this snapshot
    tracking: TrackingMap,
    store_readable: bool,
}

/// Keeps the vector store in step with the corpus on disk
pub struct Reconciler {
    root: PathBuf,
    scan_options: ScanOptions,
    tracking: TrackingStore,
    store: Arc<dyn VectorStore>,
    chunking: ChunkingConfig,
    reindex_lock: Mutex<()>,
}

impl Reconciler {
    /// Reconciler over `root`, tracking in `<root>/.doc_tracking.json`
    pub fn new(root: impl Into<PathBuf>, store: Arc<dyn VectorStore>) -> Self {
        let root = root.into();
        let tracking = TrackingStore::new(root.join(".doc_tracking.json"));
        Self {
            root,
            scan_options: ScanOptions::default(),
            tracking,
            store,
            chunking: ChunkingConfig::default(),
            reindex_lock: Mutex::new(()),
        }
    }

    /// Create from configuration
    pub fn from_config(config: &Config, store: Arc<dyn VectorStore>) -> Self {
        Self::new(&config.corpus.root, store)
            .with_tracking_path(config.corpus.tracking_path())
            .with_chunking(config.chunking)
            .with_scan_options(ScanOptions {
                follow_symlinks: config.corpus.follow_symlinks,
                ..ScanOptions::default()
            })
    }

    pub fn with_tracking_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tracking = TrackingStore::new(path);
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classify every document and refresh the tracking file.
    ///
    /// Skips the tracking write while a reindex is running or when the store
    /// could not be read.
    pub async fn status(&self) -> Result<DocumentStatus> {
        let guard = self.reindex_lock.try_lock().ok();
        let snapshot = self.snapshot().await;

        if guard.is_some() && snapshot.store_readable {
            if let Err(e) = self.tracking.save(&snapshot.tracking) {
                tracing::warn!("Failed to save tracking data: {}", e);
            }
        }

        let status = snapshot.status;
        tracing::info!(
            "Document status: {} indexed, {} unindexed, {} modified, {} missing",
            status.indexed.len(),
            status.unindexed.len(),
            status.modified.len(),
            status.missing.len()
        );
        Ok(status)
    }

    /// Bring the store up to date.
    ///
    /// With `targets`, exactly those relative paths are (re)indexed, whatever
    /// their status. Without, every unindexed or modified document is, and
    /// entries of deleted files are purged.
    pub async fn reindex(&self, targets: Option<&[String]>) -> Result<ReindexReport> {
        if !self.store.is_available() {
            tracing::warn!("Vector store unavailable; skipping reindex");
            return Ok(ReindexReport::new(ReindexOutcome::Unavailable));
        }

        let _guard = self.reindex_lock.lock().await;
        let snapshot = self.snapshot().await;
        let mut report = ReindexReport::new(ReindexOutcome::Completed);
        let mut tracking = snapshot.tracking.clone();

        let work = match targets {
            Some(targets) => self.resolve_targets(targets, &snapshot, &mut report),
            None => snapshot
                .documents
                .iter()
                .filter(|d| snapshot.states.get(&d.relative_path) != Some(&State::Indexed))
                .collect(),
        };

        for doc in work {
            let path = &doc.relative_path;
            let previously_indexed = snapshot.states.get(path) != Some(&State::Unindexed);

            match self.index_document(doc).await {
                Ok(count) => {
                    tracing::debug!("Indexed {} ({} entries)", path, count);
                    if previously_indexed {
                        report.updated_count += 1;
                    } else {
                        report.indexed_count += 1;
                    }
                    tracking.insert(
                        path.clone(),
                        TrackingRecord::new(doc.fingerprint, doc.document_id()),
                    );
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path, e);
                    report.skipped_count += 1;
                }
            }
        }

        if targets.is_none() {
            for source in &snapshot.status.missing {
                match self.remove_source(source).await {
                    Ok(n) => {
                        tracing::debug!("Purged {} entries for deleted {}", n, source);
                        report.removed_count += 1;
                    }
                    Err(e) => tracing::warn!("Failed to purge {}: {}", source, e),
                }
            }
        }

        if let Err(e) = self.tracking.save(&tracking) {
            tracing::warn!("Failed to save tracking data: {}", e);
        }

        tracing::info!(
            "Reindex: {} indexed, {} updated, {} skipped, {} removed",
            report.indexed_count,
            report.updated_count,
            report.skipped_count,
            report.removed_count
        );
        Ok(report)
    }

    fn resolve_targets<'a>(
        &self,
        targets: &[String],
        snapshot: &'a Snapshot,
        report: &mut ReindexReport,
    ) -> Vec<&'a ScannedDocument> {
        let mut seen = BTreeSet::new();
        let mut work = Vec::new();

        for target in targets {
            let Some(path) = normalize_source(target) else {
                tracing::warn!("Ignoring target outside the corpus: {}", target);
                report.skipped_count += 1;
                continue;
            };
            if !seen.insert(path.clone()) {
                continue;
            }
            match snapshot.documents.iter().find(|d| d.relative_path == path) {
                Some(doc) => work.push(doc),
                None => {
                    tracing::warn!("Target {} does not exist or is not a supported document", path);
                    report.skipped_count += 1;
                }
            }
        }
        work
    }

    async fn snapshot(&self) -> Snapshot {
        let documents = scan_corpus(&self.root, &self.scan_options);
        let previous = self.tracking.load();

        let (indexed_sources, store_readable) = match self.indexed_sources().await {
            Ok(sources) => (sources, true),
            Err(e) => {
                tracing::warn!("Cannot read indexed sources: {}", e);
                (BTreeMap::new(), false)
            }
        };

        let mut states = BTreeMap::new();
        let mut status = DocumentStatus::default();
        let mut tracking = TrackingMap::new();

        for doc in &documents {
            let path = doc.relative_path.clone();
            let current = TrackingRecord::new(doc.fingerprint, doc.document_id());

            let state = match indexed_sources.get(&path) {
                None => State::Unindexed,
                Some(entry_fingerprint) => {
                    let baseline = previous
                        .get(&path)
                        .map(|r| r.fingerprint())
                        .unwrap_or(*entry_fingerprint);
                    if baseline.matches(&doc.fingerprint) {
                        State::Indexed
                    } else {
                        tracking.insert(
                            path.clone(),
                            TrackingRecord::new(baseline, doc.document_id()),
                        );
                        State::Modified
                    }
                }
            };

            match state {
                State::Indexed => status.indexed.push(path.clone()),
                State::Unindexed => status.unindexed.push(path.clone()),
                State::Modified => status.modified.push(path.clone()),
            }
            if state != State::Modified {
                tracking.insert(path.clone(), current);
            }
            states.insert(path, state);
        }

        let on_disk: HashSet<&str> = documents.iter().map(|d| d.relative_path.as_str()).collect();
        status.missing = indexed_sources
            .keys()
            .filter(|s| !on_disk.contains(s.as_str()))
            .cloned()
            .collect();

        Snapshot {
            documents,
            states,
            status,
            tracking,
            store_readable,
        }
    }

    /// Distinct sources in the store with the fingerprint their entries carry
    async fn indexed_sources(&self) -> Result<BTreeMap<String, Fingerprint>> {
        if !self.store.is_available() {
            return Err(GroundworkError::Unavailable(
                "vector store is not available".to_string(),
            ));
        }
        let mut sources = BTreeMap::new();
        for entry in self.store.get_where(&EntryFilter::All).await? {
            sources
                .entry(entry.metadata.source)
                .or_insert(entry.metadata.fingerprint);
        }
        Ok(sources)
    }

    /// Replace a document's entries. Returns the number added.
    async fn index_document(&self, doc: &ScannedDocument) -> Result<usize> {
        let entries = self.build_entries(doc)?;
        if entries.is_empty() {
            return Err(GroundworkError::InvalidInput(
                "document has no indexable content".to_string(),
            ));
        }

        self.remove_source(&doc.relative_path).await?;

        let mut added: Vec<String> = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Err(e) = self.store.add(entry).await {
                if let Err(rollback) = self.store.delete(&added).await {
                    tracing::warn!(
                        "Rollback of {} partial entries for {} failed: {}",
                        added.len(),
                        doc.relative_path,
                        rollback
                    );
                }
                return Err(e);
            }
            added.push(entry.id.clone());
        }
        Ok(added.len())
    }

    async fn remove_source(&self, source: &str) -> Result<usize> {
        let existing = self
            .store
            .get_where(&EntryFilter::Source(source.to_string()))
            .await?;
        if existing.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = existing.into_iter().map(|e| e.id).collect();
        self.store.delete(&ids).await
    }

    fn build_entries(&self, doc: &ScannedDocument) -> Result<Vec<IndexEntry>> {
        let bytes = std::fs::read(&doc.path)?;
        let content = String::from_utf8(bytes).map_err(|_| {
            GroundworkError::InvalidInput(format!("{} is not valid UTF-8", doc.relative_path))
        })?;
        let id = doc.document_id();

        let entries = match doc.content_type {
            ContentType::PlainText => {
                chunk_text(&content, self.chunking.chunk_size, self.chunking.overlap)
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| {
                        IndexEntry::chunk(&id, i, text, &doc.relative_path, doc.fingerprint)
                    })
                    .collect()
            }
            ContentType::StructuredConfig => {
                let value: serde_yaml::Value = serde_yaml::from_str(&content)?;
                if value.is_null() {
                    Vec::new()
                } else {
                    let text = serde_json::to_string_pretty(&value)?;
                    vec![IndexEntry::config(
                        &id,
                        text,
                        &doc.relative_path,
                        doc.fingerprint,
                    )]
                }
            }
        };
        Ok(entries)
    }
}
