//! Document lifecycle for Leaf
//!
//! `FileManager` owns the active workspace and the open-document registry
//! and is the only place documents are opened, saved, closed or converted.
//! Every change to the open set is queued as a `DocumentEvent` which front
//! ends drain with [`FileManager::take_events`] to keep their tabs in step.

use crate::document::{
    classify_format, normalize_extension, serialize_for, validate_formatted, Format,
};
use crate::error::{Error, Result};
use crate::files::remove_file;
use crate::state::{DocumentEvent, OpenDocumentEntry, WorkspaceState};
use crate::workspaces::{
    absolutize, read_document_in, write_document_in, EncryptionReport, Workspace,
};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A file manager shared between windows or threads.
///
/// One mutex guards every mutation of the registry and the workspace.
pub type SharedFileManager = Arc<Mutex<FileManager>>;

// ─────────────────────────────────────────────────────────────────────────────
// Opened Document
// ─────────────────────────────────────────────────────────────────────────────

/// A document as handed to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedDocument {
    pub path: PathBuf,
    pub format: Format,
    /// Markup for formatted documents, raw text for plain ones
    pub content: String,
}

impl OpenedDocument {
    fn from_entry(entry: &OpenDocumentEntry, content: String) -> Self {
        Self {
            path: entry.path.clone(),
            format: entry.format,
            content,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Path Prompt
// ─────────────────────────────────────────────────────────────────────────────

/// Asks the user where to save a document that has no path yet.
///
/// Returning `None` means the user cancelled.
pub trait SavePathPrompt {
    fn request_save_path(&mut self, format: Format) -> Option<PathBuf>;
}

impl<F> SavePathPrompt for F
where
    F: FnMut(Format) -> Option<PathBuf>,
{
    fn request_save_path(&mut self, format: Format) -> Option<PathBuf> {
        self(format)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Opens, saves, closes and converts documents.
#[derive(Debug, Default)]
pub struct FileManager {
    workspace: Option<Workspace>,
    state: WorkspaceState,
    events: Vec<DocumentEvent>,
}

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this manager for shared use.
    pub fn into_shared(self) -> SharedFileManager {
        Arc::new(Mutex::new(self))
    }

    /// Get the open-document registry.
    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    /// Get the active workspace, if one is open.
    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    /// Drain the queued document events, oldest first.
    pub fn take_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Workspace
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `root` the active workspace.
    ///
    /// Every open document is closed first (without saving). On failure the
    /// previous workspace and its documents stay as they were.
    pub fn open_workspace(&mut self, root: impl Into<PathBuf>) -> Result<&Workspace> {
        let workspace = Workspace::open(root)?;
        self.close_all();
        Ok(&*self.workspace.insert(workspace))
    }

    /// Leave the active workspace, closing every document.
    pub fn close_workspace(&mut self) {
        if let Some(ws) = self.workspace.take() {
            info!("Closed workspace {}", ws.root().display());
        }
        self.close_all();
    }

    /// Encrypt every document in the active workspace.
    pub fn encrypt_workspace(&mut self) -> Result<EncryptionReport> {
        self.workspace_mut()?.encrypt_all()
    }

    /// Decrypt every document in the active workspace and drop its key.
    pub fn decrypt_workspace(&mut self) -> Result<EncryptionReport> {
        self.workspace_mut()?.decrypt_all()
    }

    fn workspace_mut(&mut self) -> Result<&mut Workspace> {
        self.workspace
            .as_mut()
            .ok_or_else(|| Error::Application("No workspace is open".to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Opening
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a document and make it current.
    ///
    /// The file is read from disk every time, even when it is already open,
    /// so the caller always gets what is stored. Relative paths resolve
    /// against the workspace root. Nothing changes if reading fails.
    ///
    /// # Errors
    ///
    /// - `Error::EmptyPath` if `path` is empty (the picker was dismissed)
    /// - `Error::FileRead` if the file cannot be read
    /// - `Error::DecryptionFailure` if the workspace is encrypted and the
    ///   file does not authenticate
    /// - `Error::CorruptFile` if the content is not valid for its format
    pub fn open_document(&mut self, path: impl AsRef<Path>) -> Result<OpenedDocument> {
        let path = self.resolve(path.as_ref())?;
        let format = classify_format(&path);
        let content = self.read_content(&path, format)?;

        if self.state.open(path.clone(), format, true) {
            info!("Opened {} ({})", path.display(), format.display_name());
            self.events.push(DocumentEvent::Opened {
                path: path.clone(),
                format,
            });
        } else {
            debug!("Re-opened {}", path.display());
            self.events
                .push(DocumentEvent::Activated { path: path.clone() });
        }

        Ok(OpenedDocument {
            path,
            format,
            content,
        })
    }

    /// Save the current document's buffer, then open `path`.
    ///
    /// Switching to the document that is already current only re-reads it.
    /// If the save fails the switch is abandoned.
    pub fn switch_document(
        &mut self,
        current_content: &str,
        path: impl AsRef<Path>,
    ) -> Result<OpenedDocument> {
        let target = self.resolve(path.as_ref())?;
        if let Some(current) = self.state.current().cloned() {
            if current.path != target {
                debug!("Saving {} before switching", current.path.display());
                self.write_content(&current.path, current_content, current.format, current.format)?;
                self.state.mark_saved(&current.path);
            }
        }
        self.open_document(&target)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────────────────────

    /// Save `content` to the current document.
    ///
    /// Without a current document, `prompt` is asked for a destination whose
    /// extension is then normalized to `format_hint`, and the new document
    /// becomes current. The buffer is taken to be in the current document's
    /// format (or `format_hint` for a new document) and serialized for
    /// `format_hint`: plain text is wrapped when saving formatted, markup is
    /// stripped when a formatted buffer is saved plain. A plain buffer saved
    /// plain is written verbatim.
    ///
    /// # Errors
    ///
    /// `Error::NoPathAndUserCancelled` if the prompt returns `None`.
    pub fn save_document(
        &mut self,
        content: &str,
        format_hint: Format,
        prompt: &mut impl SavePathPrompt,
    ) -> Result<PathBuf> {
        if let Some(current) = self.state.current().cloned() {
            self.write_content(&current.path, content, current.format, format_hint)?;
            self.state.mark_saved(&current.path);
            info!("Saved {}", current.path.display());
            return Ok(current.path);
        }

        let chosen = prompt
            .request_save_path(format_hint)
            .ok_or(Error::NoPathAndUserCancelled)?;
        let path = normalize_extension(&self.resolve(&chosen)?, format_hint);
        self.write_content(&path, content, format_hint, format_hint)?;
        self.register(path.clone(), format_hint);
        info!("Saved new document {}", path.display());
        Ok(path)
    }

    /// Save `content` under a new path.
    ///
    /// The current document's format is kept (or, with no current document,
    /// the format implied by `new_path`) and the extension normalized to
    /// it. The current entry moves to the new path; the old file is left on
    /// disk.
    pub fn save_as_document(
        &mut self,
        content: &str,
        new_path: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let requested = self.resolve(new_path.as_ref())?;
        let format = self
            .state
            .current()
            .map(|entry| entry.format)
            .unwrap_or_else(|| classify_format(&requested));
        let path = normalize_extension(&requested, format);

        self.write_content(&path, content, format, format)?;

        match self.state.current_path().map(Path::to_path_buf) {
            Some(old) if old == path => self.state.mark_saved(&path),
            Some(old) => {
                // Another open entry at the destination is superseded.
                if self.state.close(&path).is_some() {
                    self.events.push(DocumentEvent::Closed { path: path.clone() });
                }
                self.state.rename(&old, path.clone(), format);
                self.events.push(DocumentEvent::Renamed {
                    from: old,
                    to: path.clone(),
                    format,
                });
            }
            None => self.register(path.clone(), format),
        }

        info!("Saved as {}", path.display());
        Ok(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Closing
    // ─────────────────────────────────────────────────────────────────────────

    /// Close an open document without saving it.
    ///
    /// Returns the document that is current afterwards, freshly read, or
    /// `None` when nothing is left open. Closing the current document makes
    /// the most recently opened remaining one current; closing any other
    /// document leaves the current one alone.
    ///
    /// # Errors
    ///
    /// `Error::NotOpen` if `path` is not open. A failure re-reading the new
    /// current document is returned after the close has taken effect.
    pub fn close_document(&mut self, path: impl AsRef<Path>) -> Result<Option<OpenedDocument>> {
        let path = self.resolve(path.as_ref())?;
        if self.state.close(&path).is_none() {
            return Err(Error::NotOpen(path));
        }
        info!("Closed {}", path.display());
        self.events.push(DocumentEvent::Closed { path });

        let Some(next) = self.state.current().cloned() else {
            return Ok(None);
        };
        self.events.push(DocumentEvent::Activated {
            path: next.path.clone(),
        });

        let content = if next.exists_on_disk {
            self.read_content(&next.path, next.format)?
        } else {
            String::new()
        };
        Ok(Some(OpenedDocument::from_entry(&next, content)))
    }

    /// Close every document without saving.
    pub fn close_all(&mut self) {
        if !self.state.is_empty() {
            info!("Closing {} document(s)", self.state.len());
        }
        self.state.clear();
        self.events.push(DocumentEvent::AllClosed);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Format Conversion
    // ─────────────────────────────────────────────────────────────────────────

    /// Convert the current document on disk to `target`.
    ///
    /// The converted file is written under the normalized path and read back
    /// before the old file is deleted, so a failure at any step leaves the
    /// old file and the registry as they were.
    ///
    /// # Errors
    ///
    /// - `Error::NoCurrentDocument` if nothing is open
    /// - `Error::AlreadyExists` if a file already has the new name
    pub fn convert_format(&mut self, target: Format) -> Result<OpenedDocument> {
        let entry = self
            .state
            .current()
            .cloned()
            .ok_or(Error::NoCurrentDocument)?;

        if entry.format == target {
            debug!("{} is already {}", entry.path.display(), target.display_name());
            let content = self.read_content(&entry.path, entry.format)?;
            return Ok(OpenedDocument::from_entry(&entry, content));
        }

        let old_path = entry.path.clone();
        let new_path = normalize_extension(&old_path, target);
        // The old file is only deleted after the new one checks out, so the
        // two must never be the same file.
        if new_path == old_path || new_path.exists() {
            return Err(Error::AlreadyExists(new_path));
        }

        let old_content = self.read_content(&old_path, entry.format)?;
        let converted = serialize_for(&old_content, entry.format, target)
            .map_err(|e| Error::from(e).with_path(&old_path))?;

        write_document_in(self.workspace.as_ref(), &new_path, converted.as_bytes())?;
        if let Err(e) = self.verify_converted(&new_path, target, &converted) {
            self.discard(&new_path);
            return Err(e);
        }
        if let Err(e) = remove_file(&old_path) {
            self.discard(&new_path);
            return Err(e);
        }

        self.state.rename(&old_path, new_path.clone(), target);
        self.events.push(DocumentEvent::Renamed {
            from: old_path.clone(),
            to: new_path.clone(),
            format: target,
        });
        info!(
            "Converted {} to {} at {}",
            old_path.display(),
            target.display_name(),
            new_path.display()
        );

        Ok(OpenedDocument {
            path: new_path,
            format: target,
            content: converted,
        })
    }

    fn verify_converted(&self, path: &Path, format: Format, expected: &str) -> Result<()> {
        let written = self.read_content(path, format)?;
        if written == expected {
            Ok(())
        } else {
            Err(Error::CorruptFile {
                path: path.to_path_buf(),
                reason: "content changed while writing".to_string(),
            })
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = remove_file(path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn register(&mut self, path: PathBuf, format: Format) {
        self.state.open(path.clone(), format, true);
        self.events.push(DocumentEvent::Opened { path, format });
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(Error::EmptyPath);
        }
        match &self.workspace {
            Some(ws) if path.is_relative() => Ok(ws.resolve(path)),
            _ => absolutize(path),
        }
    }

    fn read_content(&self, path: &Path, format: Format) -> Result<String> {
        let bytes = read_document_in(self.workspace.as_ref(), path)?;
        let content = String::from_utf8(bytes).map_err(|e| Error::CorruptFile {
            path: path.to_path_buf(),
            reason: format!("not valid UTF-8 ({})", e.utf8_error()),
        })?;
        if format == Format::Formatted {
            validate_formatted(&content).map_err(|e| Error::from(e).with_path(path))?;
        }
        Ok(content)
    }

    fn write_content(&self, path: &Path, content: &str, source: Format, target: Format) -> Result<()> {
        let serialized =
            serialize_for(content, source, target).map_err(|e| Error::from(e).with_path(path))?;
        write_document_in(self.workspace.as_ref(), path, serialized.as_bytes())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
