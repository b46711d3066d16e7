use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::StoreLimits;
use crate::state::store::{DEFAULT_MAX_CHANNELS, DEFAULT_MAX_PACKETS, DEFAULT_MAX_STRINGS};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    #[serde(default)]
    pub poll: PollConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/kismet-client/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("kismet-client/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("kismet-client.toml"),
        ];

        for path in &paths {
            if path.is_file() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Store capacities
    pub fn limits(&self) -> StoreLimits {
        StoreLimits {
            max_strings: self.history.max_strings.max(1),
            max_packets: self.history.max_packets.max(1),
            max_channels: self.channels.max_channels.max(1),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Free-text lines kept from `*STRING`
    #[serde(default = "default_max_strings")]
    pub max_strings: usize,

    /// Packet summaries kept from `*PACKET`
    #[serde(default = "default_max_packets")]
    pub max_packets: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_strings: default_max_strings(),
            max_packets: default_max_packets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Size of the channel power table
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between polls in the CLI loops
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    2501
}

fn default_max_strings() -> usize {
    DEFAULT_MAX_STRINGS
}

fn default_max_packets() -> usize {
    DEFAULT_MAX_PACKETS
}

fn default_max_channels() -> usize {
    DEFAULT_MAX_CHANNELS
}

fn default_interval_ms() -> u64 {
    100
}
