//! Whole-workspace encryption and decryption.
//!
//! Both operations walk the documents in sorted order. Encrypting skips
//! files that already authenticate with the workspace key, so re-running an
//! interrupted encryption finishes the job. Decrypting checks every file
//! before touching any of them and removes the key file last.

use super::Workspace;
use crate::crypto::{key_file_path, looks_encrypted, CryptoContext};
use crate::error::{Error, Result};
use crate::files::{read_bytes, remove_file};
use log::{info, warn};

/// Outcome of an encrypt-all or decrypt-all pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptionReport {
    /// Files that were rewritten
    pub processed: usize,
    /// Files that were already in the target state
    pub skipped: usize,
}

impl Workspace {
    /// Encrypt every document, creating the key file if needed.
    ///
    /// The key file is written before any document so an interrupted run
    /// leaves the workspace marked encrypted and resumable.
    pub fn encrypt_all(&mut self) -> Result<EncryptionReport> {
        self.encrypt_all_with_progress(|_, _| {})
    }

    /// Like [`encrypt_all`](Self::encrypt_all), calling `progress(done, total)`
    /// after each file.
    pub fn encrypt_all_with_progress<F>(&mut self, mut progress: F) -> Result<EncryptionReport>
    where
        F: FnMut(usize, usize),
    {
        let crypto = match &self.crypto {
            Some(crypto) => crypto.clone(),
            None => {
                let crypto = CryptoContext::generate();
                crypto.write_key_file(&self.root)?;
                self.crypto = Some(crypto.clone());
                crypto
            }
        };

        let documents = self.documents();
        let total = documents.len();
        let mut report = EncryptionReport::default();
        for (index, path) in documents.iter().enumerate() {
            let bytes = read_bytes(path)?;
            if crypto.can_decrypt(&bytes) {
                report.skipped += 1;
            } else {
                crypto.encrypt_file(path)?;
                report.processed += 1;
            }
            progress(index + 1, total);
        }

        info!(
            "Encrypted workspace {}: {} file(s) encrypted, {} already encrypted",
            self.root.display(),
            report.processed,
            report.skipped
        );
        Ok(report)
    }

    /// Decrypt every document and remove the key file.
    pub fn decrypt_all(&mut self) -> Result<EncryptionReport> {
        self.decrypt_all_with_progress(|_, _| {})
    }

    /// Like [`decrypt_all`](Self::decrypt_all), calling `progress(done, total)`
    /// after each file.
    ///
    /// # Errors
    ///
    /// - `Error::KeyMissing` if the workspace has no usable key
    /// - `Error::DecryptionFailure` if any ciphertext fails to authenticate;
    ///   no file has been modified in that case
    pub fn decrypt_all_with_progress<F>(&mut self, mut progress: F) -> Result<EncryptionReport>
    where
        F: FnMut(usize, usize),
    {
        let crypto = self.crypto.clone().ok_or_else(|| Error::KeyMissing {
            path: key_file_path(&self.root),
        })?;

        let documents = self.documents();
        let mut pending = Vec::with_capacity(documents.len());
        let mut report = EncryptionReport::default();
        for path in &documents {
            let bytes = read_bytes(path)?;
            if crypto.can_decrypt(&bytes) {
                pending.push(path);
            } else if looks_encrypted(&bytes) {
                return Err(Error::DecryptionFailure {
                    path: Some(path.clone()),
                });
            } else {
                warn!("{} is not encrypted, leaving it as is", path.display());
                report.skipped += 1;
            }
        }

        let total = pending.len();
        for (index, path) in pending.into_iter().enumerate() {
            crypto.decrypt_file(path)?;
            report.processed += 1;
            progress(index + 1, total);
        }

        remove_file(&key_file_path(&self.root))?;
        self.crypto = None;
        info!(
            "Decrypted workspace {}: {} file(s) decrypted, {} left as is",
            self.root.display(),
            report.processed,
            report.skipped
        );
        Ok(report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.lef"), "beta").unwrap();
        fs::write(dir.path().join(".hidden"), "hidden").unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_encrypt_all_then_decrypt_all() {
        let (dir, mut ws) = setup();

        let report = ws.encrypt_all().unwrap();
        assert_eq!(report.processed, 2);
        assert!(ws.is_encrypted());
        assert!(key_file_path(dir.path()).exists());
        assert_ne!(fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read_to_string(dir.path().join(".hidden")).unwrap(), "hidden");

        let report = ws.decrypt_all().unwrap();
        assert_eq!(report.processed, 2);
        assert!(!ws.is_encrypted());
        assert!(!key_file_path(dir.path()).exists());
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dir.path().join("sub/b.lef")).unwrap(), "beta");
    }

    #[test]
    fn test_encrypt_all_resumes_without_double_encryption() {
        let (dir, mut ws) = setup();
        ws.encrypt_all().unwrap();

        // A file added after an interrupted run is picked up on the next one.
        fs::write(dir.path().join("c.txt"), "gamma").unwrap();
        let report = ws.encrypt_all().unwrap();
        assert_eq!(report, EncryptionReport { processed: 1, skipped: 2 });

        let reopened = Workspace::open(dir.path()).unwrap();
        for name in ["a.txt", "sub/b.lef", "c.txt"] {
            assert!(reopened.read_document(&dir.path().join(name)).is_ok());
        }
    }

    #[test]
    fn test_encrypt_all_reports_progress() {
        let (_dir, mut ws) = setup();
        let mut seen = Vec::new();
        ws.encrypt_all_with_progress(|done, total| seen.push((done, total)))
            .unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_decrypt_all_without_key_fails() {
        let (_dir, mut ws) = setup();
        assert!(matches!(ws.decrypt_all(), Err(Error::KeyMissing { .. })));
    }

    #[test]
    fn test_decrypt_all_with_wrong_key_touches_nothing() {
        let (dir, mut ws) = setup();
        ws.encrypt_all().unwrap();
        let before = fs::read(dir.path().join("a.txt")).unwrap();

        CryptoContext::generate().write_key_file(dir.path()).unwrap();
        let mut wrong = Workspace::open(dir.path()).unwrap();
        let err = wrong.decrypt_all().unwrap_err();
        assert!(matches!(err, Error::DecryptionFailure { path: Some(_) }));
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), before);
        assert!(key_file_path(dir.path()).exists());
    }

    #[test]
    fn test_decrypt_all_leaves_plaintext_files() {
        let (dir, mut ws) = setup();
        ws.encrypt_all().unwrap();
        fs::write(dir.path().join("late.txt"), "never encrypted").unwrap();

        let report = ws.decrypt_all().unwrap();
        assert_eq!(report, EncryptionReport { processed: 2, skipped: 1 });
        assert_eq!(
            fs::read_to_string(dir.path().join("late.txt")).unwrap(),
            "never encrypted"
        );
    }
}
