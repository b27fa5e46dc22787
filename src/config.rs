//! Configuration for the dsud daemon
//!
//! Loads configuration from a TOML file with the minimal parameters the
//! standalone daemon needs. Every section has sensible defaults so a partial
//! (or absent) file works.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

/// DSU server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// UDP port to listen on (loopback only). 26760 is the port existing
    /// DSU clients expect.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::server::DEFAULT_PORT,
        }
    }
}

/// Synthetic motion source for running the daemon without a host application
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Feed slot 0 with a generated sine-wave motion signal
    pub enabled: bool,
    /// Sample rate of the generated signal in Hz
    pub rate_hz: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_hz: 250,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 26760);
        assert!(config.demo.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 26761

            [demo]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 26761);
        assert!(!config.demo.enabled);
        assert_eq!(config.demo.rate_hz, 250);
        assert_eq!(config.logging.level, "info");
    }
}
