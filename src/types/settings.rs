use serde::{Deserialize, Serialize};

/// Top-level client settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientSettings {
    pub store: StoreSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

/// Which record store implementation backs the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite stand-in for the hosted service.
    Sqlite,
    /// PostgREST-style HTTP endpoint.
    Rest,
}

/// Record store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// SQLite file path. `None` uses `bookmarks.db` in the platform data dir.
    pub database_path: Option<String>,
    pub base_url: String,
    pub api_key: String,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_path: None,
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            table: "bookmarks".to_string(),
        }
    }
}

/// Session behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Refetch the whole list when the view becomes visible again.
    pub refresh_on_visibility: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_on_visibility: true,
        }
    }
}

/// Logging output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
