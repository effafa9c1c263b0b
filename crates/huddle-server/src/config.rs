//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HUDDLE_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on for chat clients.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the `username:password` credentials file.
    #[serde(default = "default_credentials")]
    pub credentials: PathBuf,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Health and stats endpoint.
    #[serde(default)]
    pub http: HttpConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum line length in bytes.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

/// HTTP health/stats endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Serve `/health` and `/stats`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP port.
    #[serde(default = "default_http_port")]
    pub port: u16,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn default_port() -> u16 {
    std::env::var("HUDDLE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(12345)
}

fn default_credentials() -> PathBuf {
    std::env::var_os("HUDDLE_CREDENTIALS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("users.txt"))
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> usize {
    1024
}

fn default_max_line_length() -> usize {
    huddle_protocol::DEFAULT_MAX_LINE_LENGTH
}

fn default_http_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            credentials: default_credentials(),
            limits: LimitsConfig::default(),
            http: HttpConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = [
            "huddle.toml",
            "/etc/huddle/huddle.toml",
            "~/.config/huddle/huddle.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address chat clients connect to.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.addr_with_port(self.port)
    }

    /// Get the socket address of the HTTP endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.addr_with_port(self.http.port)
    }

    fn addr_with_port(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .with_context(|| format!("Invalid host:port {}:{}", self.host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_line_length, 1024);
        assert!(config.http.enabled);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "127.0.0.1"
            port = 4000
            credentials = "/etc/huddle/users.txt"

            [limits]
            max_connections = 50

            [http]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4000);
        assert_eq!(config.credentials, PathBuf::from("/etc/huddle/users.txt"));
        assert_eq!(config.limits.max_connections, 50);
        assert_eq!(config.limits.max_line_length, 1024);
        assert!(!config.http.enabled);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_bind_addr() {
        let config: Config = toml::from_str("host = \"127.0.0.1\"\nport = 4000").unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 4000);
        assert_eq!(config.http_addr().unwrap().port(), 8080);

        let config: Config = toml::from_str("host = \"not an address\"").unwrap();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_from_missing_file() {
        assert!(Config::from_file("/nonexistent/huddle.toml").is_err());
    }
}
