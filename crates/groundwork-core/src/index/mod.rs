//! Indexing pipeline
//!
//! Corpus scanning, chunking, change tracking and reconciliation with the
//! vector store.

mod chunker;
mod reconciler;
mod scanner;
mod tracking;

pub use chunker::*;
pub use reconciler::*;
pub use scanner::*;
pub use tracking::*;
