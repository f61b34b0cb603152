//! File operations module for Leaf
//!
//! This module provides the document file manager and the low-level read
//! and atomic-write helpers shared by documents, key files and settings.

mod io;
pub mod manager;

pub use io::{read_bytes, remove_file, write_atomic};
pub(crate) use io::temp_path_for;
pub use manager::{FileManager, OpenedDocument, SavePathPrompt, SharedFileManager};
