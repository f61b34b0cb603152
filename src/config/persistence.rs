//! Configuration file persistence for Leaf
//!
//! This module handles loading and saving the settings file in a
//! platform-specific directory with robust error handling and graceful
//! fallback to defaults.

use crate::config::Settings;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "leaf";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Backup configuration file name (used during atomic writes)
const CONFIG_BACKUP_NAME: &str = "config.json.bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// - **Windows**: `%APPDATA%\leaf\`
/// - **macOS**: `~/Library/Application Support/leaf/`
/// - **Linux**: `~/.config/leaf/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be
/// determined (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Store
// ─────────────────────────────────────────────────────────────────────────────

/// A settings file inside a specific directory.
///
/// The free functions below use the platform directory; tests and embedders
/// point a store at any directory they like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A store in the platform configuration directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(get_config_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the settings file.
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Load settings, reporting every failure.
    ///
    /// A missing or empty file is not a failure; it yields defaults.
    pub fn load(&self) -> Result<Settings> {
        let config_path = self.file_path();

        if !config_path.exists() {
            debug!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Settings::default());
        }

        debug!("Loading config from: {}", config_path.display());

        let contents = fs::read_to_string(&config_path).map_err(|e| Error::ConfigLoad {
            path: config_path.clone(),
            source: Box::new(e),
        })?;

        if contents.trim().is_empty() {
            debug!("Config file is empty, using defaults");
            return Ok(Settings::default());
        }

        let settings = Settings::from_json_sanitized(&contents).map_err(|e| {
            warn!(
                "Config file at {} contains invalid JSON: {}",
                config_path.display(),
                e
            );
            Error::ConfigParse {
                message: format!("Failed to parse config file: {}", e),
                source: Some(Box::new(e)),
            }
        })?;

        info!(
            "Configuration loaded successfully from {}",
            config_path.display()
        );
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure.
    pub fn load_or_default(&self) -> Settings {
        self.load()
            .unwrap_or_warn_default(Settings::default(), "Failed to load configuration")
    }

    /// Save settings with an atomic write.
    ///
    /// The JSON is written to a backup file first which then replaces the
    /// original, so a crash never leaves a truncated settings file.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        self.ensure_dir()?;
        let config_path = self.file_path();
        let backup_path = self.dir.join(CONFIG_BACKUP_NAME);

        debug!("Saving config to: {}", config_path.display());

        let json = serde_json::to_string_pretty(settings).map_err(|e| Error::ConfigSave {
            path: config_path.clone(),
            source: Box::new(e),
        })?;

        fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
            path: backup_path.clone(),
            source: Box::new(e),
        })?;

        fs::rename(&backup_path, &config_path).map_err(|e| Error::ConfigSave {
            path: config_path.clone(),
            source: Box::new(e),
        })?;

        info!(
            "Configuration saved successfully to {}",
            config_path.display()
        );
        Ok(())
    }

    /// Load, apply `f`, and save, as one settings write.
    ///
    /// Keys other than the ones `f` touches keep their on-disk values.
    pub fn update<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.load()?;
        f(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            debug!("Creating config directory: {}", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| Error::ConfigSave {
                path: self.dir.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default-Location Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Load configuration from the default config file location.
///
/// Falls back to defaults if the directory is unknown or the file is
/// missing or corrupted.
pub fn load_config() -> Settings {
    ConfigStore::default_location()
        .and_then(|store| store.load())
        .unwrap_or_warn_default(Settings::default(), "Failed to load configuration")
}

/// Save configuration to the default config file location.
pub fn save_config(settings: &Settings) -> Result<()> {
    ConfigStore::default_location()?.save(settings)
}

/// Save configuration, ignoring errors.
///
/// Returns `true` if the save was successful, `false` otherwise.
pub fn save_config_silent(settings: &Settings) -> bool {
    match save_config(settings) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save configuration: {}", e);
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
