//! Configuration management
//!
//! This module handles loading and parsing configuration for the Devshare
//! platform. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Request limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a YAML file, falling back to defaults when the
    /// file does not exist. Environment variables override file values.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DEVSHARE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DEVSHARE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("DEVSHARE_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if url.starts_with("mysql://") {
                self.database.driver = DatabaseDriver::Mysql;
            }
            self.database.url = url;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/devshare.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Request body limits
///
/// Comment screenshots may arrive as embedded base64 payloads, so the
/// comment body limit is considerably larger than a plain JSON request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum embedded screenshot payload in bytes (default: 5MB)
    #[serde(default = "default_max_screenshot_size")]
    pub max_screenshot_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_screenshot_size: default_max_screenshot_size(),
        }
    }
}

fn default_max_screenshot_size() -> usize {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/devshare.db");
        assert_eq!(config.limits.max_screenshot_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("does-not-exist.yml")).expect("Load should succeed");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 9000
database:
  driver: mysql
  url: mysql://root@localhost/devshare
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("Parse should succeed");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "server:\n  port: 3001\n";
        let config: Config = serde_yaml::from_str(yaml).expect("Parse should succeed");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }
}
