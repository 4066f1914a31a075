//! Error types for groundwork

use thiserror::Error;

/// Result type alias using GroundworkError
pub type Result<T> = std::result::Result<T, GroundworkError>;

/// Error type alias for convenience
pub type Error = GroundworkError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const UNAVAILABLE: i32 = 4;
}

/// Main error type for groundwork
#[derive(Debug, Error)]
pub enum GroundworkError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error (HTTP {status}): {body}")]
    ExternalError { status: u16, body: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl GroundworkError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DocumentNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidPath(_)
            | Self::UnsupportedFileType(_)
            | Self::InvalidInput(_)
            | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Unavailable(_) => exit_codes::UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether retrying the failed call may succeed.
    ///
    /// Timeouts, refused connections, HTTP 429 and 5xx responses are
    /// transient. Everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ExternalError { status, .. } => *status == 429 || *status >= 500,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}
