//! Whole-document file persistence
//!
//! The document is read once when the store opens and rewritten in full,
//! pretty-printed, after every mutation. Writes go to a sibling temporary
//! file that is then renamed over the target, so a crash mid-write leaves
//! the previous snapshot intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::document::Document;

/// JSON file holding one document
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; `Ok(None)` when the file does not exist yet
    pub fn load(&self) -> Result<Option<Document>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| Error::CorruptDocument {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Read the document, falling back to the default collections when the
    /// file is missing, unreadable or corrupt
    pub fn load_or_default(&self) -> Document {
        match self.load() {
            Ok(Some(document)) => {
                tracing::info!(
                    path = %self.path.display(),
                    collections = document.collection_names().count(),
                    records = document.record_count(),
                    "loaded document"
                );
                document
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "no document on disk, starting empty");
                Document::with_default_collections()
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "error loading document, starting empty");
                Document::with_default_collections()
            }
        }
    }

    /// Overwrite the file with the full document
    pub fn save(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), records = document.record_count(), "persisted document");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
