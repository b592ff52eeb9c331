//! Persisted user preferences.
//!
//! The only persisted value is the UI language. It goes through the
//! [`PreferenceStore`] port so the session never touches storage directly:
//! [`FilePreferences`] keeps a small JSON object on disk, and
//! [`MemoryPreferences`] backs tests and `--no-persist` runs.

use crate::errors::PreferenceError;
use crate::i18n::Language;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key under which the language code is stored.
pub const LANGUAGE_KEY: &str = "nyt-feed-language";

/// Minimal string key-value port.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Read the saved language; absent, unreadable or invalid values give the default.
pub fn load_language(store: &dyn PreferenceStore) -> Language {
    match store.get(LANGUAGE_KEY) {
        Ok(Some(code)) => code.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "Ignoring saved language");
            Language::default()
        }),
        Ok(None) => Language::default(),
        Err(e) => {
            warn!(error = %e, "Failed to read language preference");
            Language::default()
        }
    }
}

/// Persist `language`.
pub fn save_language(
    store: &mut dyn PreferenceStore,
    language: Language,
) -> Result<(), PreferenceError> {
    store.set(LANGUAGE_KEY, language.code())
}

/// In-memory preferences.
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences stored as a flat JSON object in a single file.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/archive_feed/preferences.json`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("archive_feed").join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        // a corrupt file is overwritten rather than blocking the save
        let mut values = self.read_all().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        debug!(path = %self.path.display(), key, "Saved preference");
        Ok(())
    }
}
