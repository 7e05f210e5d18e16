// src/config.rs
//! Configuration management with file-backed storage

use crate::error::{PublisherError, Result};
use crate::nav::{SentenceKind, SpeedUnit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the publisher does when a cycle fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop publishing and return the error
    #[default]
    Abort,
    /// Log the error and try again next cycle
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub udp_host: String,
    pub udp_port: u16,
    pub boat_host: String,
    pub boat_port: u16,
    pub boat_timeout_ms: u64,
    pub interval_ms: u64,
    pub wind_speed_unit: SpeedUnit,
    pub sentences: Vec<SentenceKind>,
    pub error_policy: ErrorPolicy,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            udp_host: "127.0.0.1".to_string(),
            udp_port: 10110,
            boat_host: "localhost".to_string(),
            boat_port: 5150,
            boat_timeout_ms: 2000,
            interval_ms: 200,
            wind_speed_unit: SpeedUnit::MetersPerSecond,
            sentences: SentenceKind::ALL.to_vec(),
            error_policy: ErrorPolicy::Abort,
        }
    }
}

impl PublisherConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Load from a config file, falling back to defaults when it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| PublisherError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| PublisherError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PublisherError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| PublisherError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)
            .map_err(|e| PublisherError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| PublisherError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("nmea-publisher").join("config.json"))
    }

    /// Reject settings the publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(PublisherError::Config("interval must be greater than zero".to_string()));
        }
        if self.boat_timeout_ms == 0 {
            return Err(PublisherError::Config("boat service timeout must be greater than zero".to_string()));
        }
        if self.sentences.is_empty() {
            return Err(PublisherError::Config("no sentences selected".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// How long to wait for the boat service to answer a request
    pub fn boat_timeout(&self) -> Duration {
        Duration::from_millis(self.boat_timeout_ms)
    }

    /// Destination of the NMEA datagrams as `host:port`
    pub fn udp_destination(&self) -> String {
        format!("{}:{}", self.udp_host, self.udp_port)
    }

    /// Update UDP destination settings
    pub fn update_destination(&mut self, host: String, port: u16) {
        self.udp_host = host;
        self.udp_port = port;
    }

    /// Update boat service settings
    pub fn update_boat_service(&mut self, host: String, port: u16) {
        self.boat_host = host;
        self.boat_port = port;
    }

    /// Update the publishing period from seconds
    pub fn update_interval_secs(&mut self, seconds: f64) {
        self.interval_ms = (seconds * 1000.0).round().max(0.0) as u64;
    }
}
