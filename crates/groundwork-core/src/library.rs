//! Browsing and editing corpus documents
//!
//! Every path is resolved relative to the corpus root and rejected if it
//! escapes it. Saving only updates existing documents; nothing is created.

use crate::error::{GroundworkError, Result};
use crate::index::{normalize_source, scan_corpus, ContentType, ScanOptions};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Listing entry for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mtime: f64,
    /// Local modification time, `YYYY-MM-DD HH:MM`
    pub modified: String,
}

/// A document's text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentContent {
    pub name: String,
    pub path: String,
    pub content_type: ContentType,
    pub content: String,
    /// The file was not UTF-8 and was decoded as Latin-1
    pub lossy: bool,
}

/// Result of saving a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub path: String,
    pub bytes_written: usize,
    /// Parse problem in a saved YAML document; the file is written regardless
    pub yaml_warning: Option<String>,
}

/// Document access rooted at the corpus directory
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    root: PathBuf,
    scan_options: ScanOptions,
}

impl DocumentLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scan_options: ScanOptions::default(),
        }
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every supported document, sorted case-insensitively by file name
    pub fn list(&self) -> Vec<DocumentInfo> {
        let mut docs: Vec<DocumentInfo> = scan_corpus(&self.root, &self.scan_options)
            .into_iter()
            .map(|doc| DocumentInfo {
                name: doc
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| doc.relative_path.clone()),
                modified: format_mtime(doc.fingerprint.mtime),
                path: doc.relative_path,
                size: doc.fingerprint.size,
                mtime: doc.fingerprint.mtime,
            })
            .collect();

        docs.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.path.cmp(&b.path))
        });
        docs
    }

    /// Read one document. Non-UTF-8 plain text falls back to Latin-1.
    pub fn read(&self, relative: &str) -> Result<DocumentContent> {
        let (path, abs_path, content_type) = self.resolve(relative)?;
        let bytes = std::fs::read(&abs_path)?;

        let (content, lossy) = match String::from_utf8(bytes) {
            Ok(text) => (text, false),
            Err(e) if content_type == ContentType::PlainText => {
                tracing::debug!("{} is not UTF-8; decoding as Latin-1", path);
                (e.into_bytes().iter().map(|&b| b as char).collect(), true)
            }
            Err(_) => {
                return Err(GroundworkError::InvalidInput(format!(
                    "{} is not valid UTF-8",
                    path
                )))
            }
        };

        Ok(DocumentContent {
            name: file_name(&abs_path),
            path,
            content_type,
            content,
            lossy,
        })
    }

    /// Overwrite an existing document with `content`
    pub fn save(&self, relative: &str, content: &str) -> Result<SaveOutcome> {
        let (path, abs_path, content_type) = self.resolve(relative)?;
        std::fs::write(&abs_path, content)?;

        let yaml_warning = match content_type {
            ContentType::StructuredConfig => serde_yaml::from_str::<serde_yaml::Value>(content)
                .err()
                .map(|e| {
                    tracing::warn!("Saved YAML {} may have syntax issues: {}", path, e);
                    e.to_string()
                }),
            ContentType::PlainText => None,
        };

        tracing::info!("Saved {} ({} bytes)", path, content.len());
        Ok(SaveOutcome {
            path,
            bytes_written: content.len(),
            yaml_warning,
        })
    }

    /// Canonical path, absolute path and type of an existing document
    fn resolve(&self, relative: &str) -> Result<(String, PathBuf, ContentType)> {
        let path = normalize_source(relative)
            .ok_or_else(|| GroundworkError::InvalidPath(relative.to_string()))?;
        if path.rsplit('/').next().is_some_and(|name| name.starts_with('.')) {
            return Err(GroundworkError::InvalidPath(relative.to_string()));
        }

        let abs_path = self.root.join(&path);
        let content_type = ContentType::from_path(&abs_path)
            .ok_or_else(|| GroundworkError::UnsupportedFileType(path.clone()))?;

        if !abs_path.is_file() {
            return Err(GroundworkError::DocumentNotFound(path));
        }

        // Symlinks may still point outside the root
        let real_root = self.root.canonicalize()?;
        if !abs_path.canonicalize()?.starts_with(&real_root) {
            return Err(GroundworkError::InvalidPath(relative.to_string()));
        }

        Ok((path, abs_path, content_type))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn format_mtime(mtime: f64) -> String {
    DateTime::from_timestamp(mtime.trunc() as i64, 0)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn library() -> (TempDir, DocumentLibrary) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("Zebra.md"), "z").unwrap();
        fs::write(dir.path().join("sub/alpha.txt"), "alpha text").unwrap();
        fs::write(dir.path().join("router.yaml"), "name: r1\n").unwrap();
        fs::write(dir.path().join("notes.pdf"), "binary").unwrap();
        let lib = DocumentLibrary::new(dir.path());
        (dir, lib)
    }

    #[test]
    fn test_list_sorted_by_name() {
        let (_dir, lib) = library();
        let docs = lib.list();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "router.yaml", "Zebra.md"]);
        assert_eq!(docs[0].path, "sub/alpha.txt");
        assert_eq!(docs[0].size, 10);
        assert_eq!(docs[0].modified.len(), "2024-01-01 12:00".len());
    }

    #[test]
    fn test_read_document() {
        let (_dir, lib) = library();
        let doc = lib.read("sub/alpha.txt").unwrap();
        assert_eq!(doc.content, "alpha text");
        assert_eq!(doc.name, "alpha.txt");
        assert_eq!(doc.content_type, ContentType::PlainText);
        assert!(!doc.lossy);

        let yaml = lib.read("./router.yaml").unwrap();
        assert_eq!(yaml.path, "router.yaml");
        assert_eq!(yaml.content_type, ContentType::StructuredConfig);
    }

    #[test]
    fn test_read_latin1_fallback() {
        let (dir, lib) = library();
        fs::write(dir.path().join("legacy.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
        let doc = lib.read("legacy.txt").unwrap();
        assert_eq!(doc.content, "café");
        assert!(doc.lossy);
    }

    #[test]
    fn test_rejects_bad_paths() {
        let (_dir, lib) = library();
        assert!(matches!(
            lib.read("../etc/passwd.txt"),
            Err(GroundworkError::InvalidPath(_))
        ));
        assert!(matches!(
            lib.read(".doc_tracking.json"),
            Err(GroundworkError::InvalidPath(_))
        ));
        assert!(matches!(
            lib.read("notes.pdf"),
            Err(GroundworkError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            lib.read("missing.md"),
            Err(GroundworkError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_hidden_directories_are_browsable() {
        let (dir, lib) = library();
        fs::create_dir_all(dir.path().join(".notes")).unwrap();
        fs::write(dir.path().join(".notes/guide.md"), "guide").unwrap();
        fs::write(dir.path().join(".notes/.draft.md"), "draft").unwrap();

        assert!(lib.list().iter().any(|d| d.path == ".notes/guide.md"));
        assert_eq!(lib.read(".notes/guide.md").unwrap().content, "guide");
        assert!(matches!(
            lib.read(".notes/.draft.md"),
            Err(GroundworkError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_save_existing_only() {
        let (dir, lib) = library();
        let outcome = lib.save("Zebra.md", "# Zebra\nupdated").unwrap();
        assert_eq!(outcome.bytes_written, 15);
        assert!(outcome.yaml_warning.is_none());
        assert_eq!(
            fs::read_to_string(dir.path().join("Zebra.md")).unwrap(),
            "# Zebra\nupdated"
        );

        assert!(matches!(
            lib.save("new.md", "x"),
            Err(GroundworkError::DocumentNotFound(_))
        ));
        assert!(!dir.path().join("new.md").exists());
    }

    #[test]
    fn test_save_invalid_yaml_warns_but_writes() {
        let (dir, lib) = library();
        let outcome = lib.save("router.yaml", "name: [unclosed\n").unwrap();
        assert!(outcome.yaml_warning.is_some());
        assert_eq!(
            fs::read_to_string(dir.path().join("router.yaml")).unwrap(),
            "name: [unclosed\n"
        );
    }
}
