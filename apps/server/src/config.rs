//! # Server Configuration
//!
//! Layered configuration for the storefront binary.
//!
//! ## Configuration Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Environment variables (STOREFRONT_*)      ← Highest priority        │
//! │  2. Config file (storefront.toml)                                       │
//! │  3. Built-in defaults                         ← Lowest priority         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The config file is taken from `--config`, then `STOREFRONT_CONFIG`, then
//! the platform config directory. A missing file is not an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Storage Kind
// =============================================================================

/// Which backend holds the catalog and carts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// `products.json` / `carts.json` under `data_dir`.
    #[default]
    Json,
    /// One SQLite file under `data_dir`.
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "file" | "fs" => Ok(StorageKind::Json),
            "sqlite" | "db" => Ok(StorageKind::Sqlite),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Json => write!(f, "json"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl HttpSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[storage]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageKind,

    /// Directory holding the JSON files or the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite file name, relative to `data_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Upper bound on a single persist, in milliseconds.
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database_file() -> String {
    "storefront.db".to_string()
}

fn default_persist_timeout() -> u64 {
    5_000
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: StorageKind::default(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
            persist_timeout_ms: default_persist_timeout(),
        }
    }
}

impl StorageSettings {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// `[sync]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Snapshots buffered per push client before events are dropped.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,

    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
}

fn default_subscriber_capacity() -> usize {
    storefront_sync::hub::DEFAULT_SUBSCRIBER_CAPACITY
}

fn default_ping_interval() -> u64 {
    storefront_sync::hub::DEFAULT_PING_INTERVAL.as_secs()
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            subscriber_capacity: default_subscriber_capacity(),
            ping_interval_secs: default_ping_interval(),
        }
    }
}

impl SyncSettings {
    pub fn hub_config(&self) -> storefront_sync::HubConfig {
        storefront_sync::HubConfig {
            subscriber_capacity: self.subscriber_capacity,
            ping_interval: Duration::from_secs(self.ping_interval_secs),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Complete server configuration.
///
/// ## Example Config File
/// ```toml
/// [server]
/// host = "127.0.0.1"
/// port = 8080
///
/// [storage]
/// backend = "sqlite"
/// data_dir = "/var/lib/storefront"
/// persist_timeout_ms = 5000
///
/// [sync]
/// subscriber_capacity = 32
/// ping_interval_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = config_path
            .or_else(|| std::env::var_os("STOREFRONT_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file without env overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if self.storage.persist_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "storage.persist_timeout_ms must be positive".into(),
            ));
        }
        if self.storage.backend == StorageKind::Sqlite
            && self.storage.database_file.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "storage.database_file is required for the sqlite backend".into(),
            ));
        }
        if self.sync.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sync.subscriber_capacity must be positive".into(),
            ));
        }
        if self.sync.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.ping_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(host) = std::env::var("STOREFRONT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("STOREFRONT_PORT")? {
            self.server.port = port;
        }
        if let Ok(backend) = std::env::var("STOREFRONT_STORAGE") {
            self.storage.backend = backend.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "STOREFRONT_STORAGE",
                value: backend.clone(),
            })?;
        }
        if let Ok(dir) = std::env::var("STOREFRONT_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_env("STOREFRONT_PERSIST_TIMEOUT_MS")? {
            self.storage.persist_timeout_ms = ms;
        }
        if let Some(capacity) = parse_env("STOREFRONT_SUBSCRIBER_CAPACITY")? {
            self.sync.subscriber_capacity = capacity;
        }
        Ok(())
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "storefront")
            .map(|dirs| dirs.config_dir().join("storefront.toml"))
    }
}

fn parse_env<T: FromStr>(key: &'static str) -> ConfigResult<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => {
            warn!(key, "Ignoring non-unicode environment variable");
            Ok(None)
        }
    }
}
