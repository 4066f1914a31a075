//! Corpus scanning for indexing

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::{DirEntry, WalkDir};

/// Supported document extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "yaml", "yml"];

/// How a document is turned into index entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// `.txt` and `.md`, chunked
    PlainText,
    /// `.yaml` and `.yml`, stored whole as normalized JSON
    StructuredConfig,
}

impl ContentType {
    /// Classify a path by extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(Self::PlainText),
            "yaml" | "yml" => Some(Self::StructuredConfig),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain-text",
            Self::StructuredConfig => "structured-config",
        }
    }
}

/// Cheap stand-in for "has this file changed"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Modification time, seconds since the Unix epoch
    pub mtime: f64,
    pub size: u64,
}

impl Fingerprint {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            mtime,
            size: metadata.len(),
        }
    }

    pub fn of(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }

    /// Same size and an mtime within a microsecond. Persisted mtimes pass
    /// through JSON text, which may not round-trip the last bit.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        self.size == other.size && (self.mtime - other.mtime).abs() < 1e-6
    }
}

/// A supported file found under the corpus root
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedDocument {
    /// Canonical relative path, see [`normalize_source`]
    pub relative_path: String,
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub content_type: ContentType,
}

impl ScannedDocument {
    pub fn document_id(&self) -> String {
        document_id(&self.relative_path)
    }
}

/// Scan options
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub follow_symlinks: bool,
    pub exclude_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            exclude_hidden: true,
        }
    }
}

/// Scan the corpus root for supported documents.
///
/// Entries that cannot be read or stat'ed are logged and left out; they
/// never abort the scan. Results are sorted by relative path.
pub fn scan_corpus(root: &Path, options: &ScanOptions) -> Vec<ScannedDocument> {
    if !root.is_dir() {
        tracing::warn!("Corpus root {} is not a directory", root.display());
        return Vec::new();
    }

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .into_iter()
        .filter_entry(|e| !should_skip(e, options));

    let mut results = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable corpus entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(content_type) = ContentType::from_path(path) else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", path.display(), e);
                continue;
            }
        };

        let Some(relative_path) = relative_source(root, path) else {
            continue;
        };

        results.push(ScannedDocument {
            relative_path,
            path: path.to_path_buf(),
            fingerprint: Fingerprint::from_metadata(&metadata),
            content_type,
        });
    }

    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    results
}

/// Hidden files are skipped; hidden directories are still walked
fn should_skip(entry: &DirEntry, options: &ScanOptions) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_file() {
        return false;
    }
    options.exclude_hidden && entry.file_name().to_string_lossy().starts_with('.')
}

/// Canonical form of a corpus-relative path.
///
/// Forward slashes, no `.` components, `..` resolved lexically, no leading
/// separator. Returns `None` when the path escapes the root. Index entries are
/// tagged with this form and matched against it.
pub fn normalize_source(relative: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(&relative.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                parts.pop()?;
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Canonical source for a path under `root`
pub fn relative_source(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    normalize_source(&relative.to_string_lossy())
}

/// Stable identifier for a document, derived from its canonical path
pub fn document_id(relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
