//! Leaf - headless entry point
//!
//! Opens the workspace given on the command line (or the last one used),
//! reports what it contains, and lists upcoming reminders.

use chrono::Local;
use leaf::config::{load_config, save_config_silent, ConfigStore};
use leaf::document::classify_format;
use leaf::{FileManager, ReminderStore};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// Application name constant.
const APP_NAME: &str = "Leaf";

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {}", APP_NAME);

    let mut settings = load_config();
    if let Some(dict) = &settings.dictionary_path {
        info!("Summarization dictionary: {}", dict.display());
    }

    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.workspace_path.clone());

    match root {
        Some(root) => match show_workspace(&root) {
            Ok(opened) => {
                settings.add_recent_workspace(opened);
                save_config_silent(&settings);
            }
            Err(e) => {
                error!("Could not open workspace {}: {}", root.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => warn!("No workspace given and none remembered; pass a folder path"),
    }

    show_reminders();
    ExitCode::SUCCESS
}

/// Log the workspace's documents and return its absolute root.
fn show_workspace(root: &std::path::Path) -> leaf::Result<PathBuf> {
    let mut manager = FileManager::new();
    let workspace = manager.open_workspace(root)?;

    let documents = workspace.documents();
    info!(
        "{} holds {} document(s), {}",
        workspace.root().display(),
        documents.len(),
        if workspace.is_encrypted() {
            "encrypted at rest"
        } else {
            "not encrypted"
        }
    );
    for path in &documents {
        let shown = path.strip_prefix(workspace.root()).unwrap_or(path);
        info!(
            "  {} ({})",
            shown.display(),
            classify_format(path).display_name()
        );
    }
    Ok(workspace.root().to_path_buf())
}

fn show_reminders() {
    let store = match ConfigStore::default_location().and_then(ReminderStore::load) {
        Ok(store) => store,
        Err(e) => {
            warn!("Could not load reminders: {}", e);
            return;
        }
    };

    let upcoming = store.upcoming(Local::now().naive_local());
    if upcoming.is_empty() {
        info!("No upcoming reminders");
        return;
    }
    info!("{} upcoming reminder(s)", upcoming.len());
    for reminder in upcoming {
        info!(
            "  {} {}  {}",
            reminder.date, reminder.time, reminder.title
        );
    }
}
