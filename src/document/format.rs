//! Format classification and extension normalization.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of formatted (rich markup) documents.
pub const FORMATTED_EXTENSION: &str = "lef";

/// Extension given to plain documents that have none.
pub const PLAIN_EXTENSION: &str = "txt";

// ─────────────────────────────────────────────────────────────────────────────
// Format
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk representation of a document.
///
/// Determined once when a document is opened or created and carried on the
/// registry entry from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Raw UTF-8 text
    #[default]
    Plain,
    /// Rich-text markup (`.lef`)
    Formatted,
}

impl Format {
    /// Get a display name for this format.
    pub fn display_name(&self) -> &'static str {
        match self {
            Format::Plain => "Plain text",
            Format::Formatted => "Formatted",
        }
    }

    /// The extension written for this format when one must be added.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Plain => PLAIN_EXTENSION,
            Format::Formatted => FORMATTED_EXTENSION,
        }
    }
}

/// Classify a path by its extension.
///
/// Only an exact, case-sensitive `lef` extension is formatted; `NOTES.LEF`
/// is plain, matching how existing notebooks were written.
pub fn classify_format(path: &Path) -> Format {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(FORMATTED_EXTENSION) => Format::Formatted,
        _ => Format::Plain,
    }
}

/// Apply the canonical extension rule for `format` to `path`.
///
/// - Formatted: `.lef` is kept, `.txt` is replaced, anything else (including
///   no extension) gets `.lef` appended.
/// - Plain: `.lef` becomes `.txt`, no extension gets `.txt`, any other
///   extension is kept since every non-`lef` file is plain.
///
/// Normalizing an already-normalized path returns it unchanged.
pub fn normalize_extension(path: &Path, format: Format) -> PathBuf {
    let ext = path.extension().and_then(|ext| ext.to_str());
    match (format, ext) {
        (Format::Formatted, Some(FORMATTED_EXTENSION)) => path.to_path_buf(),
        (Format::Formatted, Some(PLAIN_EXTENSION)) => path.with_extension(FORMATTED_EXTENSION),
        (Format::Formatted, _) => append_extension(path, FORMATTED_EXTENSION),
        (Format::Plain, Some(FORMATTED_EXTENSION)) => path.with_extension(PLAIN_EXTENSION),
        (Format::Plain, None) => append_extension(path, PLAIN_EXTENSION),
        (Format::Plain, Some(_)) => path.to_path_buf(),
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_format() {
        assert_eq!(classify_format(Path::new("notes.lef")), Format::Formatted);
        assert_eq!(classify_format(Path::new("/a/b/todo.lef")), Format::Formatted);
        assert_eq!(classify_format(Path::new("notes.txt")), Format::Plain);
        assert_eq!(classify_format(Path::new("notes.md")), Format::Plain);
        assert_eq!(classify_format(Path::new("notes")), Format::Plain);
        assert_eq!(classify_format(Path::new("lef")), Format::Plain);
    }

    #[test]
    fn test_classify_format_is_case_sensitive() {
        assert_eq!(classify_format(Path::new("NOTES.LEF")), Format::Plain);
        assert_eq!(classify_format(Path::new("notes.Lef")), Format::Plain);
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(Format::Formatted.extension(), "lef");
        assert_eq!(Format::Plain.display_name(), "Plain text");
    }

    #[test]
    fn test_normalize_formatted() {
        let cases = [
            ("notes", "notes.lef"),
            ("notes.lef", "notes.lef"),
            ("notes.txt", "notes.lef"),
            ("report.v2", "report.v2.lef"),
            ("/w/sub/a.md", "/w/sub/a.md.lef"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                normalize_extension(Path::new(input), Format::Formatted),
                PathBuf::from(expected),
                "input {input}"
            );
        }
    }

    #[test]
    fn test_normalize_plain() {
        let cases = [
            ("notes", "notes.txt"),
            ("notes.txt", "notes.txt"),
            ("notes.lef", "notes.txt"),
            ("readme.md", "readme.md"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                normalize_extension(Path::new(input), Format::Plain),
                PathBuf::from(expected),
                "input {input}"
            );
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["notes", "notes.lef", "notes.txt", "x.y.z", "/a/b"] {
            for format in [Format::Plain, Format::Formatted] {
                let once = normalize_extension(Path::new(input), format);
                let twice = normalize_extension(&once, format);
                assert_eq!(once, twice);
                assert_eq!(classify_format(&once), format);
            }
        }
    }
}
