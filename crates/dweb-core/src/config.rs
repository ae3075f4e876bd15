//! Configuration system for dweb.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $DWEB_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/dweb/config.toml
//!   3. ~/.config/dweb/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DwebConfig {
    pub api: ApiConfig,
    pub event_log: EventLogConfig,
    pub selection: SelectionConfig,
    pub topology: TopologyConfig,
    pub mdns: MdnsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Loopback port for the HTTP API.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Active log file. Rotated backups are written next to it.
    pub path: PathBuf,
    /// Rotate once the active file would exceed this many megabytes.
    pub max_size_mb: u64,
    /// Rotated files to keep. 0 = keep all.
    pub max_backups: usize,
    /// Delete rotated files older than N days. 0 = never.
    pub max_age_days: u32,
    /// Gzip rotated files.
    pub compress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Strategy used when a request does not name one.
    pub default_strategy: String,
    /// Deadline for a single traversal. 0 = no deadline.
    pub timeout_ms: u64,
    /// Weights for the composite strategy.
    pub weights: CompositeWeights,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Service types whose roots are created at startup.
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdnsConfig {
    pub enabled: bool,
    /// A queries for names under this host are answered with our addresses.
    pub host: String,
    /// TTL in seconds on answered records.
    pub ttl: u32,
}

/// Composite score: each metric times its weight, pledge subtracted. Lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub latency: f64,
    pub disconnects: f64,
    pub fee: f64,
    pub pledge: f64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 9101 }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("events.log"),
            max_size_mb: 500,
            max_backups: 3,
            max_age_days: 28,
            compress: true,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_strategy: "cheapest".to_string(),
            timeout_ms: 250,
            weights: CompositeWeights::default(),
        }
    }
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "dweb.local".to_string(),
            ttl: 300,
        }
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            latency: 1.0,
            disconnects: 2.0,
            fee: 1.0,
            pledge: 0.01,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("dweb")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("dweb")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl DwebConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            DwebConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DWEB_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&DwebConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply DWEB_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DWEB_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Ok(v) = std::env::var("DWEB_EVENT_LOG__PATH") {
            self.event_log.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DWEB_EVENT_LOG__COMPRESS") {
            self.event_log.compress = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("DWEB_SELECTION__DEFAULT_STRATEGY") {
            self.selection.default_strategy = v;
        }
        if let Ok(v) = std::env::var("DWEB_SELECTION__TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.selection.timeout_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("DWEB_MDNS__ENABLED") {
            self.mdns.enabled = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("DWEB_MDNS__HOST") {
            self.mdns.host = v;
        }
    }
}
