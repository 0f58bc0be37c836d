// Configuration loading and parsing (cybermetrics.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no project directory available for this platform")]
    NoProjectDirs,
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub search: SearchConfig,
    /// Path of the SQLite session database. Defaults to `session.db` in the
    /// platform data directory. `":memory:"` gives an ephemeral session.
    pub session_db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Cybermetrics backend.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Debounce window for search-as-you-type, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { debounce_ms: 300 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig::default(),
            search: SearchConfig::default(),
            session_db_path: default_session_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from the platform config directory
/// (`<config dir>/cybermetrics.toml`). A missing file yields the defaults;
/// a present-but-malformed file is an error.
pub fn load_config() -> Result<Config, ConfigError> {
    let dirs = ProjectDirs::from("", "", "cybermetrics").ok_or(ConfigError::NoProjectDirs)?;
    let path = dirs.config_dir().join("cybermetrics.toml");
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

fn default_session_db_path() -> String {
    ProjectDirs::from("", "", "cybermetrics")
        .map(|dirs| {
            dirs.data_dir()
                .join("session.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "session.db".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
