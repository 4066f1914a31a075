//! Groundwork Core Library
//!
//! Incremental document indexing and retrieval for a grounded chat backend.
//!
//! # Features
//! - Paragraph/sentence-aware chunking with overlap
//! - Fingerprint-based change detection against a tracking file
//! - Per-file isolated (re)indexing into a vector store
//! - SQLite vector store with brute-force cosine similarity
//! - Attributed context assembly and prompt building for chat turns

pub mod chat;
pub mod config;
pub mod error;
pub mod index;
pub mod library;
pub mod llm;
pub mod retrieval;
pub mod retry;
pub mod store;

pub use chat::{ChatReply, ChatService, ConversationStore, Message, Role};
pub use config::{Config, EmbeddingProvider};
pub use error::{Error, GroundworkError, Result};
pub use index::{
    chunk_text, scan_corpus, DocumentStatus, Fingerprint, Reconciler, ReindexOutcome,
    ReindexReport, ScannedDocument,
};
pub use library::{DocumentContent, DocumentInfo, DocumentLibrary, SaveOutcome};
pub use llm::{create_embedder, create_generator, Embedder, Generator};
pub use retrieval::ContextBuilder;
pub use retry::RetryPolicy;
pub use store::{
    open_store, EntryFilter, EntryKind, IndexEntry, InMemoryVectorStore, QueryHit,
    SqliteVectorStore, VectorStore,
};

/// Cache directory name
pub const CACHE_DIR_NAME: &str = "groundwork";

/// Config directory name
pub const CONFIG_DIR_NAME: &str = "groundwork";
