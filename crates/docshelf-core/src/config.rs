//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/docshelf/config.toml)
//! 3. Environment variables (DOCSHELF_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "DOCSHELF";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (library snapshot, saved credential)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level for docshelf crates (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether remote calls require a validated credential
    #[serde(default = "default_true")]
    pub require_valid_credential: bool,

    /// Deadline for remote collaborator calls, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Type filter used when a remote search names none
    #[serde(default = "default_search_type")]
    pub default_search_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            require_valid_credential: true,
            request_timeout_secs: None,
            default_search_type: default_search_type(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DOCSHELF_DATA_DIR, DOCSHELF_LOG_LEVEL, ...)
    /// 2. Config file (~/.config/docshelf/config.toml or DOCSHELF_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_REQUIRE_CREDENTIAL", ENV_PREFIX)) {
            self.require_valid_credential = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // Empty or unparseable clears the timeout
        if let Ok(val) = std::env::var(format!("{}_REQUEST_TIMEOUT_SECS", ENV_PREFIX)) {
            self.request_timeout_secs = val.trim().parse().ok();
        }
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DOCSHELF_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docshelf")
            .join("config.toml")
    }

    /// Path of the saved credential
    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join("credential")
    }

    /// Path of the library snapshot
    pub fn library_path(&self) -> PathBuf {
        self.data_dir.join("library.json")
    }

    /// Collaborator deadline, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshelf")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_search_type() -> String {
    "all".to_string()
}

fn default_true() -> bool {
    true
}
