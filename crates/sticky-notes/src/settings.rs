use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::vault::NotePath;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User settings, persisted as camelCase JSON.
///
/// Every field has a default, so a partial document fills in the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StickyNoteSettings {
    pub default_width: u32,
    pub default_height: u32,
    pub sticky_notes_folder: String,
    pub auto_naming_prefix: String,
    pub include_timestamp: bool,
    /// Milliseconds of typing silence before a note is saved.
    pub auto_save_delay: u64,
    pub max_search_results: usize,
    pub enable_advanced_pinning: bool,
    pub pin_refresh_interval: u64,
    /// Vault paths of favorited notes, without duplicates.
    pub favorite_files: Vec<String>,
    pub include_template: bool,
    pub default_content: String,
    pub max_sticky_notes: usize,
    pub auto_restore: bool,
    pub enable_animations: bool,
    pub default_theme: String,
    pub remember_positions: bool,
    pub auto_save_interval: u64,
    pub show_in_status_bar: bool,
    pub enable_hotkeys: bool,
}

impl Default for StickyNoteSettings {
    fn default() -> Self {
        Self {
            default_width: 400,
            default_height: 500,
            sticky_notes_folder: "StickyNotes".to_owned(),
            auto_naming_prefix: "Sticky_".to_owned(),
            include_timestamp: true,
            auto_save_delay: 1000,
            max_search_results: 50,
            enable_advanced_pinning: true,
            pin_refresh_interval: 3000,
            favorite_files: Vec::new(),
            include_template: false,
            default_content: String::new(),
            max_sticky_notes: 20,
            auto_restore: false,
            enable_animations: true,
            default_theme: "default".to_owned(),
            remember_positions: true,
            auto_save_interval: 5000,
            show_in_status_bar: true,
            enable_hotkeys: true,
        }
    }
}

impl StickyNoteSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_delay)
    }

    pub fn is_favorite(&self, path: &NotePath) -> bool {
        self.favorite_files
            .iter()
            .any(|favorite| favorite == path.as_str())
    }

    /// Adds or removes `path` from the favorites. Returns whether the list
    /// changed.
    pub fn set_favorite(&mut self, path: &NotePath, favorite: bool) -> bool {
        let position = self
            .favorite_files
            .iter()
            .position(|existing| existing == path.as_str());
        match (favorite, position) {
            (true, None) => {
                self.favorite_files.push(path.as_str().to_owned());
                true
            }
            (false, Some(index)) => {
                self.favorite_files.remove(index);
                true
            }
            _ => false,
        }
    }
}

/// Where settings are loaded from and saved to.
pub trait SettingsStore {
    /// Returns the stored settings, or defaults when nothing is stored yet.
    fn load(&self) -> Result<StickyNoteSettings, SettingsError>;

    fn save(&self, settings: &StickyNoteSettings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<StickyNoteSettings, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => StickyNoteSettings::from_json(&json),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no settings at {}, using defaults", self.path.display());
                Ok(StickyNoteSettings::default())
            }
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&self, settings: &StickyNoteSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let json = settings.to_json()?;
        fs::write(&self.path, json).map_err(|err| self.io_error(err))?;
        log::debug!("settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Settings kept in memory as the same JSON the file store writes.
#[derive(Default)]
pub struct MemorySettingsStore {
    json: RefCell<Option<String>>,
    saves: Cell<usize>,
    read_only: Cell<bool>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            json: RefCell::new(Some(json.into())),
            ..Self::default()
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    pub fn json(&self) -> Option<String> {
        self.json.borrow().clone()
    }

    /// Makes every later save fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<StickyNoteSettings, SettingsError> {
        match self.json.borrow().as_deref() {
            Some(json) => StickyNoteSettings::from_json(json),
            None => Ok(StickyNoteSettings::default()),
        }
    }

    fn save(&self, settings: &StickyNoteSettings) -> Result<(), SettingsError> {
        if self.read_only.get() {
            return Err(SettingsError::Io {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "settings are read-only"),
            });
        }
        let json = settings.to_json()?;
        self.json.replace(Some(json));
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
