//! Configuration module for Leaf
//!
//! This module handles the persisted key-value settings (workspace path,
//! dictionary location, reminders, recent lists), including JSON
//! serialization and storage in a platform-specific directory.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
