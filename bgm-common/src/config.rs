//! Bootstrap configuration loading
//!
//! TOML bootstrap settings shared by BGM services. Every field has a
//! built-in default so a missing file is never fatal.
//!
//! Config file lookup order:
//! 1. Explicit path (command-line `--config`)
//! 2. `$XDG_CONFIG_HOME/bgm/<module>.toml` (or the platform equivalent)
//! 3. `/etc/bgm/<module>.toml` (Linux only)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default collaborator endpoint (the generation backend's development port)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default HTTP port for bgm-scene
pub const DEFAULT_PORT: u16 = 5780;

/// Reading speed used for narration timing, in words per second
pub const DEFAULT_WORDS_PER_SECOND: f32 = 2.0;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the generation/mix collaborator
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Endpoint receiving evaluation records (disabled when absent)
    #[serde(default)]
    pub record_url: Option<String>,

    /// Default reading speed for decomposition requests
    #[serde(default = "default_words_per_second")]
    pub words_per_second: f32,

    /// Timeout for a single collaborator request, in seconds
    ///
    /// Generation of a full batch can take minutes on the backend.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend_url: None,
            record_url: None,
            words_per_second: default_words_per_second(),
            request_timeout_secs: default_request_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_words_per_second() -> f32 {
    DEFAULT_WORDS_PER_SECOND
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the config file for `module_name`
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn locate_config_file(explicit: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("bgm").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/bgm").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;

    if !(config.words_per_second > 0.0) {
        return Err(Error::Config(format!(
            "words_per_second must be positive, got {}",
            config.words_per_second
        )));
    }

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Load configuration for `module_name`, falling back to defaults
///
/// An explicit path that cannot be read is an error; an absent default
/// location is not.
pub fn load_or_default(explicit: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    match locate_config_file(explicit, module_name) {
        Some(path) => load_toml_config(&path),
        None => {
            debug!("No config file found for {}, using defaults", module_name);
            Ok(TomlConfig::default())
        }
    }
}
