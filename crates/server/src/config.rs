//! Server configuration.

use protocol::packets::CompressionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default location of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from `path`, writing the defaults there first when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(io_err)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?).map_err(io_err)?;
            Ok(default_config)
        }
    }
}

/// Listener and static file settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory served under `/assets` (`json/{map}.json`, `image/{map}_radar_psd.png`).
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            assets_dir: default_assets_dir(),
        }
    }
}

fn default_port() -> u16 {
    8000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

/// Where snapshots come from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Recorded snapshots to replay (JSON array or one snapshot per line).
    /// Without one the feed reports "not in match" forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<PathBuf>,
    /// Replay rate in Hz, also reported to clients as `freq`.
    #[serde(default = "default_freq")]
    pub freq: u32,
    /// Start over after the last recorded snapshot.
    #[serde(default = "default_loop_playback")]
    pub loop_playback: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            recording: None,
            freq: default_freq(),
            loop_playback: default_loop_playback(),
        }
    }
}

fn default_freq() -> u32 {
    64
}
fn default_loop_playback() -> bool {
    true
}

/// Snapshot compression thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompressionConfig {
    /// JSON size above which the default level is used.
    #[serde(default = "default_default_above")]
    pub default_above: usize,
    /// JSON size above which the best level is used.
    #[serde(default = "default_best_above")]
    pub best_above: usize,
    /// Reported ping above which a client counts as high latency.
    #[serde(default = "default_high_latency_ms")]
    pub high_latency_ms: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            default_above: default_default_above(),
            best_above: default_best_above(),
            high_latency_ms: default_high_latency_ms(),
        }
    }
}

impl CompressionConfig {
    pub fn policy(&self) -> CompressionPolicy {
        CompressionPolicy {
            default_above: self.default_above,
            best_above: self.best_above,
        }
    }
}

fn default_default_above() -> usize {
    CompressionPolicy::default().default_above
}
fn default_best_above() -> usize {
    CompressionPolicy::default().best_above
}
fn default_high_latency_ms() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.feed.freq, 64);
        assert!(config.feed.recording.is_none());
        assert_eq!(config.compression.policy(), CompressionPolicy::default());
        assert_eq!(config.compression.high_latency_ms, 100);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [feed]
            recording = "demo.ndjson"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.feed.recording.as_deref(), Some(Path::new("demo.ndjson")));
        assert!(config.feed.loop_playback);
    }

    #[test]
    fn test_load_creates_default_file() {
        let path = std::env::temp_dir().join(format!("webradar-config-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), created);

        std::fs::remove_file(&path).unwrap();
    }
}
