//! Centralized error handling for Leaf
//!
//! This module provides a unified error type that covers all error scenarios
//! in the library: file I/O, document formats, encryption, reminders and
//! configuration.

use crate::document::CorruptFormatError;
use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the library.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    /// Failed to read file contents
    FileRead { path: PathBuf, source: io::Error },

    /// Failed to write file contents
    FileWrite { path: PathBuf, source: io::Error },

    /// The user dismissed a picker; not a real failure
    EmptyPath,

    /// No destination was known and the user declined to choose one
    NoPathAndUserCancelled,

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// An operation needed a current document but none is open
    NoCurrentDocument,

    /// The path is not in the open-document registry
    NotOpen(PathBuf),

    /// Refused to overwrite an unrelated file
    AlreadyExists(PathBuf),

    /// File content is not valid for the format it claims
    CorruptFile { path: PathBuf, reason: String },

    /// Markup could not be parsed (no file context)
    CorruptFormat(CorruptFormatError),

    // ─────────────────────────────────────────────────────────────────────────
    // Encryption Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The workspace key file is missing or unreadable
    KeyMissing { path: PathBuf },

    /// Authentication failed: wrong key or tampered data
    DecryptionFailure { path: Option<PathBuf> },

    // ─────────────────────────────────────────────────────────────────────────
    // Reminder Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Reminder input was rejected
    InvalidReminder(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    ConfigSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration directory not found or inaccessible
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    Application(String),
}

impl Error {
    /// Whether this error only means the user backed out of a picker.
    ///
    /// Front ends treat these as a silent no-op instead of showing a dialog.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::EmptyPath | Error::NoPathAndUserCancelled)
    }

    /// Attach a path to a decryption failure raised without one.
    pub(crate) fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            Error::DecryptionFailure { path: None } => Error::DecryptionFailure {
                path: Some(path.to_path_buf()),
            },
            Error::CorruptFormat(err) => Error::CorruptFile {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            other => other,
        }
    }
}

// Implement From traits for convenient error conversion
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<CorruptFormatError> for Error {
    fn from(err: CorruptFormatError) -> Self {
        Error::CorruptFormat(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for user-friendly error messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // File I/O Errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::FileRead { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            Error::FileWrite { path, source } => {
                write!(f, "Failed to write '{}': {}", path.display(), source)
            }
            Error::EmptyPath => write!(f, "No file selected"),
            Error::NoPathAndUserCancelled => write!(f, "Save cancelled: no destination chosen"),

            // Document Errors
            Error::NoCurrentDocument => write!(f, "No document is open"),
            Error::NotOpen(path) => write!(f, "'{}' is not open", path.display()),
            Error::AlreadyExists(path) => {
                write!(f, "'{}' already exists", path.display())
            }
            Error::CorruptFile { path, reason } => {
                write!(f, "'{}' is corrupt: {}", path.display(), reason)
            }
            Error::CorruptFormat(err) => write!(f, "{}", err),

            // Encryption Errors
            Error::KeyMissing { path } => {
                write!(f, "Encryption key missing or unreadable at '{}'", path.display())
            }
            Error::DecryptionFailure { path: Some(path) } => write!(
                f,
                "Could not decrypt '{}': wrong key or the file was modified",
                path.display()
            ),
            Error::DecryptionFailure { path: None } => {
                write!(f, "Could not decrypt: wrong key or the data was modified")
            }

            // Reminder Errors
            Error::InvalidReminder(msg) => write!(f, "Invalid reminder: {}", msg),

            // Configuration Errors
            Error::ConfigLoad { path, source } => {
                write!(
                    f,
                    "Failed to load configuration from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigSave { path, source } => {
                write!(
                    f,
                    "Failed to save configuration to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid configuration format: {}", message)
            }
            Error::ConfigDirNotFound => {
                write!(f, "Configuration directory not found")
            }

            // Application Errors
            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::FileRead { source, .. } | Error::FileWrite { source, .. } => Some(source),
            Error::CorruptFormat(err) => Some(err),
            Error::ConfigLoad { source, .. } => Some(source.as_ref()),
            Error::ConfigSave { source, .. } => Some(source.as_ref()),
            Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::EmptyPath
            | Error::NoPathAndUserCancelled
            | Error::NoCurrentDocument
            | Error::NotOpen(_)
            | Error::AlreadyExists(_)
            | Error::CorruptFile { .. }
            | Error::KeyMissing { .. }
            | Error::DecryptionFailure { .. }
            | Error::InvalidReminder(_)
            | Error::ConfigDirNotFound
            | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_io_error_creation() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test error");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_file_write_error() {
        let path = PathBuf::from("/test/file.lef");
        let io_err = io::Error::new(io::ErrorKind::Other, "write failed");
        let err = Error::FileWrite {
            path: path.clone(),
            source: io_err,
        };
        assert!(matches!(err, Error::FileWrite { path: p, .. } if p == path));
    }

    #[test]
    fn test_cancellation_variants() {
        assert!(Error::EmptyPath.is_cancellation());
        assert!(Error::NoPathAndUserCancelled.is_cancellation());
        assert!(!Error::NoCurrentDocument.is_cancellation());
        assert!(!Error::DecryptionFailure { path: None }.is_cancellation());
    }

    #[test]
    fn test_with_path_fills_decryption_failure() {
        let err = Error::DecryptionFailure { path: None }.with_path(Path::new("/w/a.txt"));
        assert!(
            matches!(err, Error::DecryptionFailure { path: Some(p) } if p == Path::new("/w/a.txt"))
        );
    }

    #[test]
    fn test_with_path_turns_corrupt_format_into_corrupt_file() {
        let err = Error::from(CorruptFormatError::new("unterminated tag", 3));
        let err = err.with_path(Path::new("/w/a.lef"));
        assert!(matches!(err, Error::CorruptFile { ref reason, .. } if reason.contains("unterminated")));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_result: std::result::Result<String, _> = serde_json::from_str("invalid json");
        let err = Error::from(json_result.unwrap_err());
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_display_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = Error::Io(io_err);
        let msg = format!("{}", err);
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_display_decryption_failure_names_file() {
        let err = Error::DecryptionFailure {
            path: Some(PathBuf::from("/w/secret.txt")),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("secret.txt"));
        assert!(msg.contains("wrong key"));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error as StdError;
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = Error::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_none_for_simple_variants() {
        use std::error::Error as StdError;
        assert!(Error::Application("test".to_string()).source().is_none());
        assert!(Error::ConfigDirNotFound.source().is_none());
        assert!(Error::KeyMissing {
            path: PathBuf::from("/w/.leafCryptoKey")
        }
        .source()
        .is_none());
    }

    #[test]
    fn test_unwrap_or_warn_default_ok() {
        let result: super::Result<i32> = Ok(42);
        assert_eq!(result.unwrap_or_warn_default(0, "test context"), 42);
    }

    #[test]
    fn test_unwrap_or_warn_default_err() {
        let result: super::Result<i32> = Err(Error::Application("test".to_string()));
        assert_eq!(result.unwrap_or_warn_default(0, "test context"), 0);
    }
}
