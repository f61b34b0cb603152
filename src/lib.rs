//! Leaf - document persistence and workspace state
//!
//! The toolkit-independent core of the Leaf note editor: plain and
//! formatted document formats, the file manager that tracks open documents,
//! optional at-rest encryption of a workspace, a tab registry kept in step
//! with the file manager, and reminders stored in the settings file.

pub mod config;
pub mod crypto;
pub mod document;
pub mod error;
pub mod files;
pub mod jobs;
pub mod reminders;
pub mod state;
pub mod tabs;
pub mod workspaces;

pub use document::Format;
pub use error::{Error, Result};
pub use files::{FileManager, OpenedDocument, SavePathPrompt, SharedFileManager};
pub use reminders::{Reminder, ReminderStore};
pub use state::{DocumentEvent, WorkspaceState};
pub use tabs::{Tab, TabRegistry};
pub use workspaces::Workspace;
