//! The store: one document plus where it persists

use crate::error::Result;
use crate::storage::document::Document;
use crate::storage::file::DocumentFile;

/// Sole owner of every record in the process
#[derive(Debug)]
pub struct Store {
    document: Document,
    file: Option<DocumentFile>,
}

impl Store {
    /// Open a file-backed store, reading the document exactly once
    pub fn open(file: DocumentFile) -> Self {
        let document = file.load_or_default();
        Self {
            document,
            file: Some(file),
        }
    }

    /// Store that never touches the filesystem
    pub fn in_memory(document: Document) -> Self {
        Self {
            document,
            file: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn file(&self) -> Option<&DocumentFile> {
        self.file.as_ref()
    }

    /// Write the full document back to its file, if it has one
    pub fn persist(&self) -> Result<()> {
        match &self.file {
            Some(file) => file.save(&self.document),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_reads_once_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        let mut store = Store::open(DocumentFile::new(&path));
        store.document_mut().ensure_collection("messages");
        store.persist().unwrap();

        let reopened = Store::open(DocumentFile::new(&path));
        assert!(reopened.document().contains("messages"));
        assert!(reopened.document().contains("users"));
    }

    #[test]
    fn test_in_memory_persist_is_noop() {
        let store = Store::in_memory(Document::new());
        assert!(store.file().is_none());
        store.persist().unwrap();
    }
}
