//! User settings for Leaf
//!
//! This module defines the `Settings` struct persisted as the application's
//! key-value settings file. Key names match the ones earlier releases wrote
//! (`dictionaryPath`, `reminders_dict`, `workspacePath`) so existing settings
//! keep loading.

use crate::reminders::Reminder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Application settings.
///
/// All fields have sensible defaults via the `Default` trait and
/// `#[serde(default)]`; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Summarization
    // ─────────────────────────────────────────────────────────────────────────
    /// Location of the downloaded word-embedding dictionary, if any
    #[serde(rename = "dictionaryPath")]
    pub dictionary_path: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────────────────
    // Reminders
    // ─────────────────────────────────────────────────────────────────────────
    /// Every reminder, keyed by creation timestamp (ms)
    #[serde(rename = "reminders_dict")]
    pub reminders: BTreeMap<i64, Reminder>,

    // ─────────────────────────────────────────────────────────────────────────
    // Session & History
    // ─────────────────────────────────────────────────────────────────────────
    /// Last opened workspace root
    #[serde(rename = "workspacePath")]
    pub workspace_path: Option<PathBuf>,

    /// Recently opened workspaces (folders), most recent first
    pub recent_workspaces: Vec<PathBuf>,

    /// Maximum number of recent workspaces to remember
    pub max_recent_workspaces: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dictionary_path: None,
            reminders: BTreeMap::new(),
            workspace_path: None,
            recent_workspaces: Vec::new(),
            max_recent_workspaces: 10,
        }
    }
}

impl Settings {
    /// Upper bound for the recent workspaces list.
    pub const MAX_RECENT_LIMIT: usize = 100;

    /// Record a workspace as last opened and move it to the front of the
    /// recent workspaces list.
    ///
    /// If the workspace is already listed, it's moved to the front. The list
    /// is trimmed to `max_recent_workspaces`.
    pub fn add_recent_workspace(&mut self, path: PathBuf) {
        self.workspace_path = Some(path.clone());
        self.recent_workspaces.retain(|p| p != &path);
        self.recent_workspaces.insert(0, path);
        self.recent_workspaces.truncate(self.max_recent_workspaces);
    }

    /// Clamp values that may have been hand-edited into nonsense.
    pub fn sanitize(&mut self) {
        self.max_recent_workspaces = clamp_limit(self.max_recent_workspaces);
        self.recent_workspaces.truncate(self.max_recent_workspaces);

        // A reminder stored under a key other than its own is unreachable
        // by delete; re-key it.
        let misfiled: Vec<i64> = self
            .reminders
            .iter()
            .filter(|(key, reminder)| **key != reminder.key)
            .map(|(key, _)| *key)
            .collect();
        for key in misfiled {
            if let Some(mut reminder) = self.reminders.remove(&key) {
                reminder.key = key;
                self.reminders.insert(key, reminder);
            }
        }
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

fn clamp_limit(limit: usize) -> usize {
    match limit {
        0 => 10,
        n => n.min(Settings::MAX_RECENT_LIMIT),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::Reminder;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.dictionary_path.is_none());
        assert!(settings.reminders.is_empty());
        assert!(settings.workspace_path.is_none());
        assert_eq!(settings.max_recent_workspaces, 10);
    }

    #[test]
    fn test_add_recent_workspace_moves_to_front_and_trims() {
        let mut settings = Settings {
            max_recent_workspaces: 3,
            ..Settings::default()
        };

        for root in ["/one", "/two", "/three", "/one", "/four"] {
            settings.add_recent_workspace(PathBuf::from(root));
        }

        assert_eq!(
            settings.recent_workspaces,
            vec![
                PathBuf::from("/four"),
                PathBuf::from("/one"),
                PathBuf::from("/three"),
            ]
        );
    }

    #[test]
    fn test_add_recent_workspace_sets_workspace_path() {
        let mut settings = Settings::default();
        settings.add_recent_workspace(PathBuf::from("/notes"));
        settings.add_recent_workspace(PathBuf::from("/journal"));
        assert_eq!(settings.workspace_path, Some(PathBuf::from("/journal")));
        assert_eq!(settings.recent_workspaces.len(), 2);
    }

    #[test]
    fn test_serialized_key_names() {
        let settings = Settings {
            dictionary_path: Some(PathBuf::from("/dict.bin")),
            workspace_path: Some(PathBuf::from("/notes")),
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"dictionaryPath\""));
        assert!(json.contains("\"reminders_dict\""));
        assert!(json.contains("\"workspacePath\""));
    }

    #[test]
    fn test_reminders_round_trip_through_json() {
        let mut settings = Settings::default();
        let reminder = Reminder::new(1_700_000_000_000, "2024-03-01", "1:00 PM", "Dentist", "")
            .unwrap();
        settings.reminders.insert(reminder.key, reminder.clone());

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded = Settings::from_json_sanitized(&json).unwrap();
        assert_eq!(loaded.reminders.get(&reminder.key), Some(&reminder));
    }

    #[test]
    fn test_sanitize_clamps_limits() {
        let settings = Settings::from_json_sanitized(r#"{"max_recent_workspaces": 0}"#).unwrap();
        assert_eq!(settings.max_recent_workspaces, 10);
        let settings = Settings::from_json_sanitized(r#"{"max_recent_workspaces": 5000}"#).unwrap();
        assert_eq!(settings.max_recent_workspaces, Settings::MAX_RECENT_LIMIT);
    }

    #[test]
    fn test_sanitize_rekeys_misfiled_reminders() {
        let mut settings = Settings::default();
        let reminder = Reminder::new(5, "2024-03-01", "9:00 AM", "Standup", "").unwrap();
        settings.reminders.insert(7, reminder);
        settings.sanitize();
        assert_eq!(settings.reminders.get(&7).unwrap().key, 7);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"workspacePath": "/notes", "geometry": "AdnQywADAAAAAA"}"#;
        let settings = Settings::from_json_sanitized(json).unwrap();
        assert_eq!(settings.workspace_path, Some(PathBuf::from("/notes")));
    }
}
