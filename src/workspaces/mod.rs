//! Workspace management for Leaf
//!
//! A workspace is a root directory the editor treats as a notebook. This
//! module provides:
//! - Root scanning and sidecar key detection
//! - Deterministic enumeration of the documents in the tree
//! - Reading and writing documents through the workspace's encryption
//! - Encrypting or decrypting every document at once

mod encryption;

pub use encryption::EncryptionReport;

use crate::crypto::{key_file_path, CryptoContext};
use crate::error::{Error, Result};
use crate::files::{read_bytes, write_atomic};
use log::{debug, info};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

// ─────────────────────────────────────────────────────────────────────────────
// Workspace
// ─────────────────────────────────────────────────────────────────────────────

/// An open workspace root and its encryption state.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root path of the workspace
    root: PathBuf,
    /// Present when the root holds a key file
    crypto: Option<CryptoContext>,
}

impl Workspace {
    /// Open a folder as a workspace.
    ///
    /// If the root holds a `.leafCryptoKey` file, every document in the tree
    /// is treated as ciphertext from now on.
    ///
    /// # Errors
    ///
    /// - `Error::Application` if `root` is not a directory
    /// - `Error::KeyMissing` if a key file exists but cannot be used
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = absolutize(&root.into())?;
        if !root.is_dir() {
            return Err(Error::Application(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let crypto = if key_file_path(&root).exists() {
            Some(CryptoContext::load_key_file(&root)?)
        } else {
            None
        };

        info!(
            "Opened workspace {} ({})",
            root.display(),
            if crypto.is_some() { "encrypted" } else { "plain" }
        );
        Ok(Self { root, crypto })
    }

    /// Get the workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether documents in this workspace are encrypted at rest.
    pub fn is_encrypted(&self) -> bool {
        self.crypto.is_some()
    }

    pub fn crypto(&self) -> Option<&CryptoContext> {
        self.crypto.as_ref()
    }

    /// Resolve a possibly relative path against the workspace root.
    ///
    /// The result has no `.` or `..` components.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        normalize_lexically(&self.root.join(path))
    }

    /// Whether `path` is a document governed by this workspace.
    ///
    /// Paths outside the root and dot-prefixed paths (the key file, temp
    /// files, hidden folders) are not. `..` is folded first, so
    /// `root/sub/../a.txt` is governed like `root/a.txt`.
    pub fn governs(&self, path: &Path) -> bool {
        let path = normalize_lexically(path);
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        relative.components().all(|component| match component {
            Component::Normal(name) => !name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }

    /// All documents in the tree, sorted by path.
    pub fn documents(&self) -> Vec<PathBuf> {
        collect_documents(&self.root)
    }

    /// Read a document's bytes, decrypting when the workspace is encrypted.
    ///
    /// # Errors
    ///
    /// `Error::DecryptionFailure` if the workspace is encrypted and the file
    /// does not authenticate with its key. There is no plaintext fallback.
    pub fn read_document(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize_lexically(path);
        let bytes = read_bytes(&path)?;
        match self.cipher_for(&path) {
            Some(crypto) => crypto.decrypt(&bytes).map_err(|e| e.with_path(&path)),
            None => Ok(bytes),
        }
    }

    /// Write a document's bytes atomically, encrypting when required.
    pub fn write_document(&self, path: &Path, plaintext: &[u8]) -> Result<()> {
        let path = normalize_lexically(path);
        match self.cipher_for(&path) {
            Some(crypto) => write_atomic(&path, &crypto.encrypt(plaintext)?),
            None => write_atomic(&path, plaintext),
        }
    }

    fn cipher_for(&self, path: &Path) -> Option<&CryptoContext> {
        self.crypto.as_ref().filter(|_| self.governs(path))
    }
}

/// Read a file outside any workspace, or inside `workspace` when given.
pub fn read_document_in(workspace: Option<&Workspace>, path: &Path) -> Result<Vec<u8>> {
    match workspace {
        Some(ws) => ws.read_document(path),
        None => read_bytes(path),
    }
}

/// Write a file outside any workspace, or inside `workspace` when given.
pub fn write_document_in(workspace: Option<&Workspace>, path: &Path, bytes: &[u8]) -> Result<()> {
    match workspace {
        Some(ws) => ws.write_document(path, bytes),
        None => write_atomic(path, bytes),
    }
}

/// Make a path absolute against the process working directory, without
/// `.` or `..` components.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyPath);
    }
    if path.is_absolute() {
        return Ok(normalize_lexically(path));
    }
    Ok(normalize_lexically(&std::env::current_dir()?.join(path)))
}

/// Drop `.` components and fold each `..` into its parent.
///
/// Purely textual: symlinks are not resolved and nothing is read from disk.
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory Scanning
// ─────────────────────────────────────────────────────────────────────────────

/// Collect every non-hidden file under `root`, sorted for a stable order.
///
/// Dot-prefixed files and folders are skipped entirely.
fn collect_documents(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
