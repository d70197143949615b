//! Client settings on disk.
//!
//! `ClientSettings` is kept as pretty-printed JSON in `settings.json` under the
//! platform config directory. Keys missing from the file take their defaults,
//! so a file written by an older client keeps loading.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::{ClientSettings, StoreBackend};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Environment variable that pins the local database next to a UI shell's data.
pub const DATA_DIR_ENV: &str = "BOOKMARKS_DATA_DIR";

/// Location of the settings file.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` in the platform config directory.
    pub fn in_config_dir() -> Self {
        Self::new(platform::get_config_dir().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings. An absent file yields the defaults.
    pub fn load(&self) -> Result<ClientSettings, SettingsError> {
        match self.read()? {
            Some(settings) => Ok(settings),
            None => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                Ok(ClientSettings::default())
            }
        }
    }

    /// Like [`load`](Self::load), but writes the defaults out on first run so
    /// there is a file to edit.
    pub fn load_or_create(&self) -> Result<ClientSettings, SettingsError> {
        if let Some(settings) = self.read()? {
            return Ok(settings);
        }
        let settings = ClientSettings::default();
        self.save(&settings)?;
        info!(path = %self.path.display(), "Wrote default settings");
        Ok(settings)
    }

    pub fn save(&self, settings: &ClientSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::Io(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| SettingsError::Io(format!("cannot write {}: {}", self.path.display(), e)))
    }

    fn read(&self) -> Result<Option<ClientSettings>, SettingsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SettingsError::Io(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let settings = serde_json::from_str(&content)
            .map_err(|e| SettingsError::Parse(format!("{}: {}", self.path.display(), e)))?;
        info!(path = %self.path.display(), "Loaded settings");
        Ok(Some(settings))
    }
}

/// Switches to the SQLite backend with its database file inside `dir`.
pub fn pin_data_dir(settings: &mut ClientSettings, dir: &Path) {
    settings.store.backend = StoreBackend::Sqlite;
    settings.store.database_path = Some(dir.join("bookmarks.db").to_string_lossy().into_owned());
}
