//! CLI command handlers

pub mod chat;
pub mod context;
pub mod health;
pub mod ls;
pub mod reindex;
pub mod save;
pub mod show;
pub mod status;

use anyhow::Result;
use groundwork_core::index::ScanOptions;
use groundwork_core::{create_embedder, open_store, Config, DocumentLibrary, VectorStore};
use std::sync::Arc;

/// Vector store for the configured embedding provider
pub(crate) fn open_index(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let embedder = create_embedder(config)?;
    Ok(open_store(config, embedder))
}

pub(crate) fn library(config: &Config) -> DocumentLibrary {
    DocumentLibrary::new(&config.corpus.root).with_scan_options(ScanOptions {
        follow_symlinks: config.corpus.follow_symlinks,
        ..ScanOptions::default()
    })
}
