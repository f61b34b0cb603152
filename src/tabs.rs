//! Tab registry for Leaf
//!
//! A toolkit-independent model of the editor's tab strip. It is driven by
//! the `DocumentEvent`s the file manager emits, so the tabs and the
//! open-document registry never disagree about what is open or current.

use crate::document::{classify_format, Format};
use crate::state::{DocumentEvent, WorkspaceState};
use log::{debug, warn};
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Tab
// ─────────────────────────────────────────────────────────────────────────────

/// One tab in the tab strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    /// Unique ID for this tab, stable for the tab's lifetime
    pub id: usize,
    /// Path of the document shown in this tab
    pub path: PathBuf,
    /// Format of that document
    pub format: Format,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Untitled")
            .to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tab Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Tabs in display order plus the selected one.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    /// ID of the selected tab
    active: Option<usize>,
    next_tab_id: usize,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all tabs (read-only).
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Get the selected tab, if any.
    pub fn active(&self) -> Option<&Tab> {
        let id = self.active?;
        self.tabs.iter().find(|t| t.id == id)
    }

    /// Get the selected tab's position in the strip.
    pub fn active_index(&self) -> Option<usize> {
        let id = self.active?;
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Find a tab by document path.
    pub fn find_by_path(&self, path: &Path) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.path == path)
    }

    /// Apply one document event.
    pub fn apply(&mut self, event: &DocumentEvent) {
        match event {
            DocumentEvent::Opened { path, format } => {
                let id = self.ensure_tab(path, *format);
                self.active = Some(id);
            }
            DocumentEvent::Activated { path } => {
                let id = self.ensure_tab(path, classify_format(path));
                self.active = Some(id);
            }
            DocumentEvent::Closed { path } => {
                let Some(index) = self.position(path) else {
                    warn!("Close event for {} which has no tab", path.display());
                    return;
                };
                let tab = self.tabs.remove(index);
                // The manager follows up with `Activated` for the next document.
                if self.active == Some(tab.id) {
                    self.active = None;
                }
                debug!("Removed tab {} ({})", tab.id, path.display());
            }
            DocumentEvent::Renamed { from, to, format } => {
                if from != to {
                    if let Some(stale) = self.position(to) {
                        self.tabs.remove(stale);
                    }
                }
                match self.tabs.iter_mut().find(|t| &t.path == from) {
                    Some(tab) => {
                        tab.path = to.clone();
                        tab.format = *format;
                    }
                    None => {
                        let id = self.ensure_tab(to, *format);
                        self.active = Some(id);
                    }
                }
            }
            DocumentEvent::AllClosed => {
                self.tabs.clear();
                self.active = None;
            }
        }
    }

    /// Apply a batch of events in order.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a DocumentEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Rebuild from the open-document registry.
    ///
    /// Tabs for documents that are no longer open are dropped, missing ones
    /// are appended in the order their documents were opened, and the
    /// current document's tab is selected.
    pub fn reconcile(&mut self, state: &WorkspaceState) {
        self.tabs.retain(|t| state.contains(&t.path));
        for tab in &mut self.tabs {
            tab.format = state.format_of(&tab.path);
        }

        let mut entries = state.documents();
        entries.reverse();
        for entry in entries {
            self.ensure_tab(&entry.path, entry.format);
        }

        self.active = state
            .current_path()
            .and_then(|path| self.find_by_path(path))
            .map(|t| t.id);
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.tabs.iter().position(|t| t.path == path)
    }

    /// Return the ID of the tab for `path`, adding one if needed.
    fn ensure_tab(&mut self, path: &Path, format: Format) -> usize {
        if let Some(tab) = self.tabs.iter_mut().find(|t| t.path == path) {
            tab.format = format;
            return tab.id;
        }
        let id = self.next_tab_id;
        self.next_tab_id += 1;
        self.tabs.push(Tab {
            id,
            path: path.to_path_buf(),
            format,
        });
        debug!("Added tab {} for {}", id, path.display());
        id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileManager;
    use std::fs;
    use tempfile::TempDir;

    fn opened(path: &str) -> DocumentEvent {
        DocumentEvent::Opened {
            path: PathBuf::from(path),
            format: classify_format(Path::new(path)),
        }
    }

    fn titles(tabs: &TabRegistry) -> Vec<String> {
        tabs.tabs().iter().map(Tab::title).collect()
    }

    /// Tabs and registry agree on the open set and the selection.
    fn assert_consistent(tabs: &TabRegistry, state: &WorkspaceState) {
        assert_eq!(tabs.len(), state.len());
        for tab in tabs.tabs() {
            assert!(state.contains(&tab.path), "stale tab {}", tab.path.display());
        }
        assert_eq!(
            tabs.active().map(|t| t.path.as_path()),
            state.current_path()
        );
    }

    #[test]
    fn test_opened_adds_and_selects() {
        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/a.txt"));
        tabs.apply(&opened("/w/b.lef"));
        assert_eq!(titles(&tabs), vec!["a.txt", "b.lef"]);
        assert_eq!(tabs.active().unwrap().title(), "b.lef");
        assert_eq!(tabs.active().unwrap().format, Format::Formatted);
    }

    #[test]
    fn test_opened_never_duplicates() {
        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/a.txt"));
        tabs.apply(&opened("/w/b.txt"));
        tabs.apply(&opened("/w/a.txt"));
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs.active_index(), Some(0));
    }

    #[test]
    fn test_closed_active_waits_for_activation() {
        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/a.txt"));
        tabs.apply(&opened("/w/b.txt"));
        tabs.apply(&DocumentEvent::Closed {
            path: PathBuf::from("/w/b.txt"),
        });
        assert!(tabs.active().is_none());

        tabs.apply(&DocumentEvent::Activated {
            path: PathBuf::from("/w/a.txt"),
        });
        assert_eq!(tabs.active().unwrap().title(), "a.txt");
    }

    #[test]
    fn test_renamed_updates_in_place() {
        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/a.txt"));
        let id = tabs.active().unwrap().id;
        tabs.apply(&DocumentEvent::Renamed {
            from: PathBuf::from("/w/a.txt"),
            to: PathBuf::from("/w/a.lef"),
            format: Format::Formatted,
        });
        let tab = tabs.find_by_path(Path::new("/w/a.lef")).unwrap();
        assert_eq!(tab.id, id);
        assert_eq!(tab.format, Format::Formatted);
        assert!(tabs.find_by_path(Path::new("/w/a.txt")).is_none());
    }

    #[test]
    fn test_all_closed_clears() {
        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/a.txt"));
        tabs.apply(&DocumentEvent::AllClosed);
        assert!(tabs.is_empty());
        assert!(tabs.active().is_none());
    }

    #[test]
    fn test_follows_file_manager_events() {
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        let mut fm = FileManager::new();
        fm.open_workspace(dir.path()).unwrap();
        let mut tabs = TabRegistry::new();

        for name in ["a.txt", "b.txt", "c.txt"] {
            fm.open_document(name).unwrap();
        }
        tabs.apply_all(&fm.take_events());
        assert_consistent(&tabs, fm.state());

        fm.close_document("c.txt").unwrap();
        tabs.apply_all(&fm.take_events());
        assert_consistent(&tabs, fm.state());
        assert_eq!(tabs.active().unwrap().title(), "b.txt");

        fm.convert_format(Format::Formatted).unwrap();
        tabs.apply_all(&fm.take_events());
        assert_consistent(&tabs, fm.state());
        assert_eq!(titles(&tabs), vec!["a.txt", "b.lef"]);

        fm.save_as_document("moved", "a").unwrap();
        tabs.apply_all(&fm.take_events());
        assert_consistent(&tabs, fm.state());

        fm.close_all();
        tabs.apply_all(&fm.take_events());
        assert_consistent(&tabs, fm.state());
    }

    #[test]
    fn test_reconcile_rebuilds_from_state() {
        let mut state = WorkspaceState::new();
        state.open(PathBuf::from("/w/a.txt"), Format::Plain, true);
        state.open(PathBuf::from("/w/b.lef"), Format::Formatted, true);

        let mut tabs = TabRegistry::new();
        tabs.apply(&opened("/w/stale.txt"));
        tabs.reconcile(&state);

        assert_eq!(titles(&tabs), vec!["a.txt", "b.lef"]);
        assert_consistent(&tabs, &state);
    }
}
