//! Application settings and configuration types.
//!
//! Settings are loaded from `~/.config/recall/settings.json` (or XDG
//! equivalent) at startup, with missing files falling back to defaults.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Local database configuration.
    pub database: DatabaseSettings,
    /// AI provider configuration.
    pub provider: ProviderSettings,
    /// Semantic retrieval settings.
    pub retrieval: RetrievalSettings,
    /// Keyword search settings.
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            provider: ProviderSettings::default(),
            retrieval: RetrievalSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the user config directory, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::config_file_path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring malformed settings file: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Path of the settings file, when a config directory exists.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "recall").map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Resolves the database path: the configured override if set,
    /// otherwise a file in the platform data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        ProjectDirs::from("", "", "recall")
            .map(|dirs| dirs.data_dir().join("recall.db"))
            .unwrap_or_else(|| PathBuf::from("recall.db"))
    }
}

/// Local database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Explicit database file path. Defaults to the platform data
    /// directory when unset.
    pub path: Option<PathBuf>,
}

/// Configuration for the AI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Custom API endpoint (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Chat model identifier.
    pub chat_model: String,
    /// Embedding model identifier.
    pub embed_model: String,
    /// Embedding vector dimension.
    pub dimension: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            chat_model: "gemini-2.0-flash".to_string(),
            embed_model: "text-embedding-004".to_string(),
            dimension: 768,
            timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    /// Reads the API key from the configured environment variable.
    /// Returns an empty string when unset, which providers reject at
    /// request time.
    pub fn api_key(&self) -> String {
        std::env::var(&self.api_key_env).unwrap_or_default()
    }
}

/// Settings for semantic retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Number of top-ranked messages used as answer context.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

/// Settings for keyword search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Maximum number of search results.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { max_results: 10 }
    }
}
