//! Configuration for the space state aggregator.
//!
//! A single `config.json` names the output broker, the topic prefix, and
//! the list of tracked spaces. A space reports status either through a
//! SpaceAPI document (`url` or a `spacedirectory` entry resolved at
//! startup) or through its own MQTT broker (`mqtt`), or both.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Top-level configuration, read from `config.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Output broker address, `host` or `host:port`.
    pub server: String,
    /// Prefix prepended to every space topic on the output broker.
    pub prefix: String,
    #[serde(default)]
    pub spaces: Vec<SpaceConfig>,
}

/// One tracked space.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpaceConfig {
    /// Output topic suffix, unique per space.
    pub topic: String,
    /// Direct status document URL.
    pub url: Option<String>,
    /// SpaceAPI directory entry to resolve into a status URL instead.
    pub spacedirectory: Option<String>,
    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
    /// How long a pushed state suppresses polling, in seconds.
    #[serde(default = "default_push_state_ttl")]
    pub mqtt_timeout: u64,
    /// Delay before reconnecting to the space's broker, in seconds.
    #[serde(default = "default_reconnect_interval")]
    pub mqtt_reconnect_interval: u64,
    /// The space's own broker, if it pushes status updates.
    pub mqtt: Option<SpaceMqttConfig>,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            url: None,
            spacedirectory: None,
            interval: default_poll_interval(),
            mqtt_timeout: default_push_state_ttl(),
            mqtt_reconnect_interval: default_reconnect_interval(),
            mqtt: None,
        }
    }
}

/// A space-side broker endpoint. Also deserialized from the `state.mqtt`
/// section of a fetched status document.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpaceMqttConfig {
    /// Broker host. An endpoint without a host is never connected.
    pub host: Option<String>,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Topic carrying the space's status payloads.
    pub topic: Option<String>,
    /// Payload announcing the space is open.
    pub open: Option<String>,
    /// Payload announcing the space is closed.
    pub closed: Option<String>,
}

impl SpaceMqttConfig {
    pub fn open_payload(&self) -> &str {
        self.open.as_deref().unwrap_or("open")
    }

    pub fn closed_payload(&self) -> &str {
        self.closed.as_deref().unwrap_or("closed")
    }
}

fn default_poll_interval() -> u64 {
    300
}

fn default_push_state_ttl() -> u64 {
    300
}

fn default_reconnect_interval() -> u64 {
    60
}

fn default_broker_port() -> u16 {
    1883
}

/// Configuration loading errors. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("space {topic}: no directory entry named {name:?}")]
    UnknownDirectoryEntry { topic: String, name: String },
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
