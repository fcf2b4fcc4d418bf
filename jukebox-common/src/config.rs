//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the station starts on defaults.
//! A config file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the track directory
pub const TRACKS_DIR_ENV: &str = "JUKEBOX_TRACKS_DIR";

/// Environment variable overriding the HTTP port
pub const PORT_ENV: &str = "JUKEBOX_PORT";

/// Compiled default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Compiled default track directory (relative to the working directory)
pub const DEFAULT_TRACKS_DIR: &str = "tracks";

/// Contents of the TOML configuration file
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the audio files
    #[serde(default)]
    pub tracks_dir: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Live stream tuning
    #[serde(default)]
    pub stream: StreamConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML config text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }
}

/// Live stream tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Bytes read from a track per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Nominal stream bitrate used to pace chunks (0 = unpaced)
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Chunks a listener may have pending before it is disconnected
    #[serde(default = "default_listener_buffer_chunks")]
    pub listener_buffer_chunks: usize,
}

fn default_chunk_size() -> usize {
    4096
}

fn default_bitrate_kbps() -> u32 {
    128
}

fn default_listener_buffer_chunks() -> usize {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            bitrate_kbps: default_bitrate_kbps(),
            listener_buffer_chunks: default_listener_buffer_chunks(),
        }
    }
}

impl StreamConfig {
    /// Reject settings that would stall the player or the hub
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("stream.chunk_size must be greater than 0".to_string()));
        }
        if self.listener_buffer_chunks == 0 {
            return Err(Error::Config(
                "stream.listener_buffer_chunks must be greater than 0".to_string(),
            ));
        }
        if self.bitrate_kbps > 0 && self.chunk_size as u64 * 8_000 < u64::from(self.bitrate_kbps) {
            return Err(Error::Config(format!(
                "stream.chunk_size {} is under a microsecond of audio at {} kbps",
                self.chunk_size, self.bitrate_kbps
            )));
        }
        Ok(())
    }

    /// Time one chunk represents at the configured bitrate
    ///
    /// Returns None when pacing is disabled. Never zero.
    pub fn chunk_interval(&self) -> Option<std::time::Duration> {
        if self.bitrate_kbps == 0 {
            return None;
        }
        let bytes_per_sec = u64::from(self.bitrate_kbps) * 1000 / 8;
        let micros = self.chunk_size as u64 * 1_000_000 / bytes_per_sec;
        Some(std::time::Duration::from_micros(micros.max(1)))
    }
}

/// Fully resolved station configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub tracks_dir: PathBuf,
    pub port: u16,
    pub stream: StreamConfig,
}

/// Resolves station configuration from all sources
///
/// Command-line values are injected by the caller (the binary owns argument
/// parsing); environment and file lookups happen here.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_tracks_dir: Option<PathBuf>,
    cli_port: Option<u16>,
    config_file: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track directory given on the command line
    pub fn with_cli_tracks_dir(mut self, tracks_dir: Option<PathBuf>) -> Self {
        self.cli_tracks_dir = tracks_dir;
        self
    }

    /// Port given on the command line
    pub fn with_cli_port(mut self, port: Option<u16>) -> Self {
        self.cli_port = port;
        self
    }

    /// Explicit config file path; a missing explicit file is an error
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Resolve every setting
    pub fn resolve(&self) -> Result<StationConfig> {
        let file = self.load_file()?;

        let tracks_dir = self.resolve_tracks_dir(&file);
        let port = self.resolve_port(&file)?;

        file.stream.validate()?;

        Ok(StationConfig {
            tracks_dir,
            port,
            stream: file.stream,
        })
    }

    fn resolve_tracks_dir(&self, file: &TomlConfig) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(dir) = &self.cli_tracks_dir {
            debug!("Track directory from command line: {}", dir.display());
            return dir.clone();
        }

        // Priority 2: Environment variable
        if let Ok(dir) = std::env::var(TRACKS_DIR_ENV) {
            if !dir.is_empty() {
                debug!("Track directory from {}: {}", TRACKS_DIR_ENV, dir);
                return PathBuf::from(dir);
            }
        }

        // Priority 3: TOML config file
        if let Some(dir) = &file.tracks_dir {
            return dir.clone();
        }

        // Priority 4: Compiled default
        PathBuf::from(DEFAULT_TRACKS_DIR)
    }

    fn resolve_port(&self, file: &TomlConfig) -> Result<u16> {
        if let Some(port) = self.cli_port {
            return Ok(port);
        }

        if let Ok(port) = std::env::var(PORT_ENV) {
            if !port.is_empty() {
                return port
                    .parse()
                    .map_err(|_| Error::Config(format!("{} is not a valid port: {}", PORT_ENV, port)));
            }
        }

        Ok(file.port.unwrap_or(DEFAULT_PORT))
    }

    fn load_file(&self) -> Result<TomlConfig> {
        if let Some(path) = &self.config_file {
            info!("Loading config file {}", path.display());
            return TomlConfig::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config file {}", path.display());
                TomlConfig::load(&path)
            }
            _ => {
                warn!("No config file found, using defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Platform config file location: `<config_dir>/jukebox/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jukebox").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defaults() {
        let stream = StreamConfig::default();
        assert_eq!(stream.chunk_size, 4096);
        assert_eq!(stream.bitrate_kbps, 128);
        assert_eq!(stream.listener_buffer_chunks, 64);
        assert!(stream.validate().is_ok());
    }

    #[test]
    fn test_chunk_interval_at_128kbps() {
        // 16000 bytes/sec, 4000-byte chunks → 250ms each
        let stream = StreamConfig {
            chunk_size: 4000,
            bitrate_kbps: 128,
            listener_buffer_chunks: 8,
        };
        assert_eq!(stream.chunk_interval(), Some(std::time::Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_bitrate_disables_pacing() {
        let stream = StreamConfig {
            bitrate_kbps: 0,
            ..StreamConfig::default()
        };
        assert_eq!(stream.chunk_interval(), None);
    }

    #[test]
    fn test_interval_below_a_microsecond_rejected() {
        let stream = StreamConfig {
            chunk_size: 100,
            bitrate_kbps: 1_000_000,
            ..StreamConfig::default()
        };
        assert!(matches!(stream.validate(), Err(Error::Config(_))));
        assert_eq!(stream.chunk_interval(), Some(std::time::Duration::from_micros(1)));

        let smallest = StreamConfig {
            chunk_size: 125,
            bitrate_kbps: 1_000_000,
            ..StreamConfig::default()
        };
        assert!(smallest.validate().is_ok());
        assert_eq!(smallest.chunk_interval(), Some(std::time::Duration::from_micros(1)));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let stream = StreamConfig {
            chunk_size: 0,
            ..StreamConfig::default()
        };
        assert!(matches!(stream.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml_uses_field_defaults() {
        let config = TomlConfig::parse("port = 9000\n[stream]\nbitrate_kbps = 320\n").unwrap();
        assert_eq!(config.port, Some(9000));
        assert!(config.tracks_dir.is_none());
        assert_eq!(config.stream.bitrate_kbps, 320);
        assert_eq!(config.stream.chunk_size, 4096);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(TomlConfig::parse("port = \"nope\""), Err(Error::Config(_))));
    }
}
