//! At-rest encryption for workspace files
//!
//! A workspace is encrypted with a single symmetric key kept in a sidecar
//! file (`.leafCryptoKey`) at the workspace root. Files are whole-buffer
//! tokens: URL-safe base64 of a version byte, a random 24-byte nonce and the
//! XChaCha20-Poly1305 ciphertext. The Poly1305 tag makes tampering and wrong
//! keys detectable; decryption never yields unauthenticated plaintext.
//!
//! Losing the key file makes every encrypted file in the workspace
//! permanently unrecoverable.

use crate::error::{Error, Result};
use crate::files::{read_bytes, write_atomic};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the sidecar key file in a workspace root.
pub const KEY_FILE_NAME: &str = ".leafCryptoKey";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TOKEN_VERSION: u8 = 0x80;
/// Poly1305 tag length; the smallest valid ciphertext.
const TAG_LEN: usize = 16;

/// Path of the key file for a workspace root.
pub fn key_file_path(root: &Path) -> PathBuf {
    root.join(KEY_FILE_NAME)
}

// ─────────────────────────────────────────────────────────────────────────────
// Crypto Context
// ─────────────────────────────────────────────────────────────────────────────

/// A workspace's symmetric key and the operations that use it.
#[derive(Clone)]
pub struct CryptoContext {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoContext").finish_non_exhaustive()
    }
}

impl CryptoContext {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Parse the text form of a key as stored in the key file.
    ///
    /// Returns `None` if the text is not a base64 encoded 32-byte key.
    pub fn from_key_text(text: &str) -> Option<Self> {
        let bytes = URL_SAFE.decode(text.trim()).ok()?;
        let key: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self { key })
    }

    /// The text form of the key.
    pub fn key_text(&self) -> String {
        URL_SAFE.encode(self.key)
    }

    /// Load the key file of a workspace root.
    ///
    /// # Errors
    ///
    /// `Error::KeyMissing` if the file is absent, unreadable or malformed.
    pub fn load_key_file(root: &Path) -> Result<Self> {
        let path = key_file_path(root);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            debug!("Key file {} unreadable: {}", path.display(), e);
            Error::KeyMissing { path: path.clone() }
        })?;
        Self::from_key_text(&text).ok_or(Error::KeyMissing { path })
    }

    /// Write this key as the key file of a workspace root.
    pub fn write_key_file(&self, root: &Path) -> Result<PathBuf> {
        let path = key_file_path(root);
        write_atomic(&path, self.key_text().as_bytes())?;
        info!("Wrote workspace key file {}", path.display());
        Ok(path)
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    /// Encrypt a buffer into a text token.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| Error::Application("Encryption failed".to_string()))?;

        let mut raw = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        raw.push(TOKEN_VERSION);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(raw).into_bytes())
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// `Error::DecryptionFailure` if the data is not a token, was produced
    /// with another key, or was modified.
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>> {
        let raw = decode_token(token).ok_or(Error::DecryptionFailure { path: None })?;
        let (nonce, ciphertext) = raw[1..].split_at(NONCE_LEN);
        self.cipher()
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionFailure { path: None })
    }

    /// Whether this key authenticates `token`.
    pub fn can_decrypt(&self, token: &[u8]) -> bool {
        self.decrypt(token).is_ok()
    }

    /// Encrypt a file in place.
    pub fn encrypt_file(&self, path: &Path) -> Result<()> {
        let plaintext = read_bytes(path)?;
        let token = self.encrypt(&plaintext)?;
        write_atomic(path, &token)?;
        debug!("Encrypted {}", path.display());
        Ok(())
    }

    /// Decrypt a file in place. The file is untouched on failure.
    pub fn decrypt_file(&self, path: &Path) -> Result<()> {
        let token = read_bytes(path)?;
        let plaintext = self.decrypt(&token).map_err(|e| e.with_path(path))?;
        write_atomic(path, &plaintext)?;
        debug!("Decrypted {}", path.display());
        Ok(())
    }
}

/// Whether `data` has the shape of an encryption token, regardless of key.
pub fn looks_encrypted(data: &[u8]) -> bool {
    decode_token(data).is_some()
}

fn decode_token(token: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(token).ok()?;
    let raw = URL_SAFE.decode(text.trim()).ok()?;
    if raw.len() < 1 + NONCE_LEN + TAG_LEN || raw[0] != TOKEN_VERSION {
        return None;
    }
    Some(raw)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let ctx = CryptoContext::generate();
        let samples: [&[u8]; 4] = [b"", b"hello", "ø æ å 中".as_bytes(), &[0, 255, 7, 13]];
        for data in samples {
            let token = ctx.encrypt(data).unwrap();
            assert_eq!(ctx.decrypt(&token).unwrap(), data);
        }
    }

    #[test]
    fn test_token_is_text_and_not_plaintext() {
        let ctx = CryptoContext::generate();
        let token = ctx.encrypt(b"secret note").unwrap();
        let text = String::from_utf8(token).unwrap();
        assert!(!text.contains("secret"));
        assert!(looks_encrypted(text.as_bytes()));
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let ctx = CryptoContext::generate();
        assert_ne!(ctx.encrypt(b"same").unwrap(), ctx.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = CryptoContext::generate();
        let b = CryptoContext::generate();
        let token = a.encrypt(b"for a only").unwrap();
        assert!(matches!(
            b.decrypt(&token),
            Err(Error::DecryptionFailure { path: None })
        ));
        assert!(!b.can_decrypt(&token));
    }

    #[test]
    fn test_tampered_token_fails() {
        let ctx = CryptoContext::generate();
        let token = ctx.encrypt(b"integrity matters").unwrap();
        let mut raw = URL_SAFE.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE.encode(raw).into_bytes();
        assert!(ctx.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_plaintext_is_not_a_token() {
        let ctx = CryptoContext::generate();
        assert!(!looks_encrypted(b"hello world"));
        assert!(ctx.decrypt(b"hello world").is_err());
        assert!(ctx.decrypt(b"").is_err());
    }

    #[test]
    fn test_key_text_round_trip() {
        let ctx = CryptoContext::generate();
        let restored = CryptoContext::from_key_text(&ctx.key_text()).unwrap();
        let token = ctx.encrypt(b"x").unwrap();
        assert_eq!(restored.decrypt(&token).unwrap(), b"x");
        assert!(CryptoContext::from_key_text("not base64 !!").is_none());
        assert!(CryptoContext::from_key_text(&URL_SAFE.encode([1u8; 16])).is_none());
    }

    #[test]
    fn test_key_file_write_and_load() {
        let dir = TempDir::new().unwrap();
        let ctx = CryptoContext::generate();
        let path = ctx.write_key_file(dir.path()).unwrap();
        assert!(path.ends_with(KEY_FILE_NAME));
        let loaded = CryptoContext::load_key_file(dir.path()).unwrap();
        assert_eq!(loaded.key_text(), ctx.key_text());
    }

    #[test]
    fn test_load_missing_or_corrupt_key_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            CryptoContext::load_key_file(dir.path()),
            Err(Error::KeyMissing { .. })
        ));
        std::fs::write(key_file_path(dir.path()), "garbage").unwrap();
        assert!(matches!(
            CryptoContext::load_key_file(dir.path()),
            Err(Error::KeyMissing { .. })
        ));
    }

    #[test]
    fn test_encrypt_and_decrypt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "private").unwrap();

        let ctx = CryptoContext::generate();
        ctx.encrypt_file(&path).unwrap();
        assert_ne!(std::fs::read(&path).unwrap(), b"private");

        ctx.decrypt_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "private");
    }

    #[test]
    fn test_decrypt_file_with_wrong_key_leaves_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "private").unwrap();
        CryptoContext::generate().encrypt_file(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = CryptoContext::generate().decrypt_file(&path).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailure { path: Some(_) }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
