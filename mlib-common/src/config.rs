//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (handled by each binary's clap `Args`)
//! 2. Environment variable (clap `env = "MLIB_..."` fallback)
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or malformed TOML file never stops a service: a warning is
//! logged and compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default port of the media (range file) server
pub const DEFAULT_MEDIA_PORT: u16 = 5810;

/// Default port of the playback service
pub const DEFAULT_PLAYER_PORT: u16 = 5811;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Base folder for relative asset paths and the catalog database
    pub root_folder: Option<PathBuf>,

    /// Media server section
    pub media: MediaSection,

    /// Playback service section
    pub player: PlayerSection,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[media]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaSection {
    pub port: u16,
    /// SQLite catalog path (relative paths resolve against the root folder)
    pub database_path: PathBuf,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_MEDIA_PORT,
            database_path: PathBuf::from("library.db"),
        }
    }
}

/// `[player]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerSection {
    pub port: u16,
    /// Base URL of the media server, used to build `/audio/{song_id}` sources
    pub media_base_url: String,
    /// Interval between progress signals while playing
    pub progress_interval_ms: u64,
    /// EventBus buffer size
    pub event_capacity: usize,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PLAYER_PORT,
            media_base_url: format!("http://127.0.0.1:{}", DEFAULT_MEDIA_PORT),
            progress_interval_ms: 250,
            event_capacity: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with graceful degradation
    ///
    /// Uses `explicit` when given, otherwise the first discovered default
    /// location. Any failure falls back to compiled defaults; the returned
    /// `ConfigOrigin` says which happened so the caller can log it once
    /// tracing is up.
    pub fn load(explicit: Option<&Path>) -> (Self, ConfigOrigin) {
        let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return (Self::default(), ConfigOrigin::Defaults),
        };

        match Self::from_file(&path) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => (
                Self::default(),
                ConfigOrigin::Fallback {
                    path,
                    reason: e.to_string(),
                },
            ),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.player.progress_interval_ms == 0 {
            return Err(Error::Config(
                "player.progress_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.player.event_capacity == 0 {
            return Err(Error::Config(
                "player.event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Root folder: CLI/env value, then TOML, then the platform default
    pub fn resolve_root_folder(&self, cli_arg: Option<PathBuf>) -> PathBuf {
        cli_arg
            .or_else(|| self.root_folder.clone())
            .unwrap_or_else(default_root_folder)
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// No file found; compiled defaults
    Defaults,
    /// File found but unusable; compiled defaults
    Fallback { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    /// Log the origin (call after tracing is initialised)
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigOrigin::Defaults => info!("No config file found, using compiled defaults"),
            ConfigOrigin::Fallback { path, reason } => warn!(
                "Failed to load config file {}: {} (using compiled defaults)",
                path.display(),
                reason
            ),
        }
    }
}

/// First existing config file among the platform locations
///
/// Linux: `~/.config/mlib/config.toml`, then `/etc/mlib/config.toml`.
/// Elsewhere: the platform config dir only.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mlib").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mlib/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mlib"))
        .unwrap_or_else(|| PathBuf::from("./mlib_data"))
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
