//! Configuration management for the embedded FTP server
//!
//! Separates engine configuration (ports, budgets, credentials) from host
//! configuration (where the workstation build keeps its files and how it binds).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest transfer buffer that still holds one rendered listing line.
pub const MIN_BUFFER_SIZE: usize = 128;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,

    #[serde(flatten)]
    pub host: HostConfig,
}

/// Settings consumed by the protocol engine itself
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Port for the FTP control connection
    pub control_port: u16,

    /// Fixed port advertised by PASV
    pub data_port: u16,

    /// Size of the shared transfer buffer in bytes
    pub buffer_size: usize,

    /// Period at which the scheduler calls `tick()`
    pub cycle_time_ms: u64,

    /// Idle time on the control connection before it is closed
    pub control_timeout_ms: u64,

    /// Idle time on the data channel before it is abandoned
    pub data_timeout_ms: u64,

    /// Consecutive would-block sends tolerated before the peer is declared dead
    pub max_tx_retries: u8,

    /// Pending transmissions held by the send queue
    pub queue_capacity: usize,

    /// Longest working path or path parameter accepted
    pub max_path_len: usize,

    /// Listing entries rendered per tick
    pub entries_per_page: usize,

    /// Failed PASS attempts before the control connection is dropped
    pub max_login_attempts: u8,

    pub username: String,
    pub password: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            control_port: 21,
            data_port: 2024,
            buffer_size: 512,
            cycle_time_ms: 10,
            control_timeout_ms: 300_000,
            data_timeout_ms: 5_000,
            max_tx_retries: 25,
            queue_capacity: 4,
            max_path_len: 256,
            entries_per_page: 4,
            max_login_attempts: 3,
            username: "micro".to_string(),
            password: "python".to_string(),
        }
    }
}

/// Settings for the workstation host runtime
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostConfig {
    /// Local address the listening sockets bind to
    pub bind_address: Ipv4Addr,

    /// Address reported to clients in the PASV reply
    pub advertise_address: Ipv4Addr,

    /// Directory whose sub-directories are served as volumes
    pub server_root: String,

    /// Upload path that is redirected into the update sink
    pub update_image_path: String,

    /// Host file receiving the update image
    pub update_image_file: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            advertise_address: Ipv4Addr::LOCALHOST,
            server_root: "./server_root".to_string(),
            update_image_path: "/flash/sys/mcuimg.bin".to_string(),
            update_image_file: "./mcuimg.bin".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional TOML file with `FTPD_*` environment overrides
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FTPD").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.engine.validate()?;

        if self.host.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if !self.host.update_image_path.starts_with('/') {
            return Err(config::ConfigError::Message(
                "update_image_path must be absolute".into(),
            ));
        }

        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 || self.data_port == 0 {
            return Err(config::ConfigError::Message("Ports cannot be 0".into()));
        }

        if self.control_port == self.data_port {
            return Err(config::ConfigError::Message(
                "data_port must differ from control_port".into(),
            ));
        }

        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(config::ConfigError::Message(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE} bytes"
            )));
        }

        if self.cycle_time_ms == 0 {
            return Err(config::ConfigError::Message(
                "cycle_time_ms must be greater than 0".into(),
            ));
        }

        if self.queue_capacity == 0 || self.entries_per_page == 0 {
            return Err(config::ConfigError::Message(
                "queue_capacity and entries_per_page must be greater than 0".into(),
            ));
        }

        if self.max_path_len < 2 {
            return Err(config::ConfigError::Message(
                "max_path_len is too small".into(),
            ));
        }

        Ok(())
    }

    /// Scheduler period as Duration
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }

    /// Control idle budget in ticks
    pub fn control_timeout_ticks(&self) -> u32 {
        ticks(self.control_timeout_ms, self.cycle_time_ms)
    }

    /// Data idle budget in ticks
    pub fn data_timeout_ticks(&self) -> u32 {
        ticks(self.data_timeout_ms, self.cycle_time_ms)
    }
}

impl HostConfig {
    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }
}

fn ticks(timeout_ms: u64, cycle_ms: u64) -> u32 {
    (timeout_ms / cycle_ms.max(1)).min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn timeouts_convert_to_ticks() {
        let config = EngineConfig::default();
        assert_eq!(config.data_timeout_ticks(), 500);
        assert_eq!(config.control_timeout_ticks(), 30_000);
    }

    #[test]
    fn rejects_shared_ports() {
        let config = EngineConfig {
            data_port: 21,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_tiny_buffer() {
        let config = EngineConfig {
            buffer_size: 16,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
