//! Appliance configuration.
//!
//! Every field has a default matching the shipped firmware behavior, so an
//! empty JSON object (or no file at all) is a valid configuration.

use crate::error;

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_dir: PathBuf,
    /// Explicit device name. Overrides and replaces the persisted one.
    pub device_name: Option<String>,
    pub arbiter: ArbiterConfig,
    pub presence: PresenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("gridbeacon-data"),
            device_name: None,
            arbiter: ArbiterConfig::default(),
            presence: PresenceConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> error::Result<Self> {
        let data = fs::read(path)?;

        Ok(serde_json::from_slice(&data)?)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Maximum number of stored network credentials.
    pub capacity: usize,
    pub poll_interval_ms: u64,
    /// Status polls per credential before the attempt counts as failed.
    pub max_polls: u32,
    pub access_point_ssid: String,
    pub access_point_passphrase: String,
    /// Address the device owns on its self-hosted network.
    pub access_point_addr: Ipv4Addr,
}

impl ArbiterConfig {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound of a single connection attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.poll_interval() * self.max_polls
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            poll_interval_ms: 500,
            max_polls: 40,
            access_point_ssid: String::from("GridBeacon-Setup"),
            access_point_passphrase: String::from("gridbeacon"),
            access_point_addr: Ipv4Addr::new(192, 168, 4, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    pub announce_interval_ms: u64,
    pub stale_after_ms: u64,
    /// Maximum number of tracked peers.
    pub capacity: usize,
}

impl PresenceConfig {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            group: Ipv4Addr::new(239, 255, 0, 1),
            port: 5353,
            announce_interval_ms: 30_000,
            stale_after_ms: 120_000,
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
