//! Open-document registry for Leaf
//!
//! This module defines `WorkspaceState`, which tracks the documents open in
//! the editor and which one is current, and `DocumentEvent`, the
//! notifications the file manager emits when that set changes.
//!
//! Every mutation goes through `WorkspaceState` methods so the invariant
//! "the current document, if any, is an open document" always holds.

use crate::document::{classify_format, Format};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Open Document Entry
// ─────────────────────────────────────────────────────────────────────────────

/// A document in the open-document registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocumentEntry {
    /// Absolute path of the document
    pub path: PathBuf,
    /// Format determined when the document was opened or created
    pub format: Format,
    /// Whether the document has been written to disk
    pub exists_on_disk: bool,
    /// Stamp of the most recent open, higher is more recent
    opened_seq: u64,
}

impl OpenDocumentEntry {
    /// Get the display title for this document.
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Untitled")
            .to_string()
    }

    /// Sequence number of the most recent open.
    pub fn opened_seq(&self) -> u64 {
        self.opened_seq
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document Events
// ─────────────────────────────────────────────────────────────────────────────

/// Changes to the open-document set, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A document was added to the registry and made current
    Opened { path: PathBuf, format: Format },
    /// An already-open document became current
    Activated { path: PathBuf },
    /// A document was removed from the registry
    Closed { path: PathBuf },
    /// A document moved to a new path (save-as or format conversion)
    Renamed {
        from: PathBuf,
        to: PathBuf,
        format: Format,
    },
    /// Every document was closed
    AllClosed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace State
// ─────────────────────────────────────────────────────────────────────────────

/// The open documents and the current-document pointer.
#[derive(Debug, Default)]
pub struct WorkspaceState {
    open_documents: HashMap<PathBuf, OpenDocumentEntry>,
    current: Option<PathBuf>,
    next_seq: u64,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of open documents.
    pub fn len(&self) -> usize {
        self.open_documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_documents.is_empty()
    }

    /// Check whether a path is open.
    pub fn contains(&self, path: &Path) -> bool {
        self.open_documents.contains_key(path)
    }

    /// Get an open document by path.
    pub fn get(&self, path: &Path) -> Option<&OpenDocumentEntry> {
        self.open_documents.get(path)
    }

    /// Get the current document's entry.
    pub fn current(&self) -> Option<&OpenDocumentEntry> {
        self.current
            .as_ref()
            .and_then(|path| self.open_documents.get(path))
    }

    /// Get the current document's path.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// All open documents, most recently opened first.
    pub fn documents(&self) -> Vec<&OpenDocumentEntry> {
        let mut docs: Vec<_> = self.open_documents.values().collect();
        docs.sort_by(|a, b| b.opened_seq.cmp(&a.opened_seq));
        docs
    }

    /// Register `path` (or refresh it if already open) and make it current.
    ///
    /// Returns `true` if a new entry was created. An existing entry keeps
    /// its format unless `format` differs, in which case the new format
    /// wins since the caller just read the file.
    pub fn open(&mut self, path: PathBuf, format: Format, exists_on_disk: bool) -> bool {
        let seq = self.bump_seq();
        let created = match self.open_documents.get_mut(&path) {
            Some(entry) => {
                entry.opened_seq = seq;
                entry.format = format;
                entry.exists_on_disk |= exists_on_disk;
                false
            }
            None => {
                self.open_documents.insert(
                    path.clone(),
                    OpenDocumentEntry {
                        path: path.clone(),
                        format,
                        exists_on_disk,
                        opened_seq: seq,
                    },
                );
                true
            }
        };
        debug!(
            "{} {} as current document",
            if created { "Registered" } else { "Re-activated" },
            path.display()
        );
        self.current = Some(path);
        created
    }

    /// Record that a document has been written to disk.
    pub fn mark_saved(&mut self, path: &Path) {
        if let Some(entry) = self.open_documents.get_mut(path) {
            entry.exists_on_disk = true;
        }
    }

    /// Move an open document to a new path, keeping its open order.
    ///
    /// If the document was current it stays current under the new path.
    /// Returns `false` if `from` is not open. An entry already at `to` is
    /// replaced.
    pub fn rename(&mut self, from: &Path, to: PathBuf, format: Format) -> bool {
        let Some(mut entry) = self.open_documents.remove(from) else {
            return false;
        };
        entry.path = to.clone();
        entry.format = format;
        entry.exists_on_disk = true;
        self.open_documents.insert(to.clone(), entry);
        if self.current.as_deref() == Some(from) {
            self.current = Some(to);
        }
        true
    }

    /// Remove a document from the registry.
    ///
    /// If it was current, the most recently opened remaining document
    /// becomes current (or none, if the registry is now empty). Returns the
    /// removed entry.
    pub fn close(&mut self, path: &Path) -> Option<OpenDocumentEntry> {
        let removed = self.open_documents.remove(path)?;
        if self.current.as_deref() == Some(path) {
            self.current = self
                .open_documents
                .values()
                .max_by_key(|entry| entry.opened_seq)
                .map(|entry| entry.path.clone());
        }
        debug!(
            "Closed {}, current is now {:?}",
            path.display(),
            self.current
        );
        Some(removed)
    }

    /// Remove every document.
    pub fn clear(&mut self) {
        self.open_documents.clear();
        self.current = None;
    }

    /// Format of an open document, falling back to its extension.
    pub fn format_of(&self, path: &Path) -> Format {
        self.open_documents
            .get(path)
            .map(|entry| entry.format)
            .unwrap_or_else(|| classify_format(path))
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
