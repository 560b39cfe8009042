//! Configuration schema definitions.
//!
//! This module defines the process settings for the proxy. The host table
//! itself lives in [`crate::config::table`]; these are the values that
//! select where it is read from and how the listeners behave.
//! All types derive Serde traits for deserialization from a TOML file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (plaintext and TLS bind addresses).
    pub listener: ListenerConfig,

    /// Primary TLS certificate pair.
    pub tls: TlsConfig,

    /// Host table location and reload behavior.
    pub routes: RoutesConfig,

    /// Backend dispatch timeouts.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plaintext bind address (e.g., ":8080" or "127.0.0.1:8080").
    pub http_address: String,

    /// TLS bind address.
    pub https_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: ":8080".to_string(),
            https_address: ":443".to_string(),
        }
    }
}

/// Primary certificate pair for the TLS listener.
///
/// When set, this pair is loaded before any pair named in the host table
/// and is served to clients that do not send a matching server name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: Option<PathBuf>,

    /// Path to private key file (PEM).
    pub key_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Both halves of the primary pair, if configured.
    pub fn primary_pair(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }

    /// True when either half of the primary pair is set.
    pub fn is_requested(&self) -> bool {
        self.cert_path.is_some() || self.key_path.is_some()
    }

    /// Name of the missing half when only one path is set.
    pub fn missing_half(&self) -> Option<&'static str> {
        match (&self.cert_path, &self.key_path) {
            (Some(_), None) => Some("key"),
            (None, Some(_)) => Some("certificate"),
            _ => None,
        }
    }
}

/// Host table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path to the host table file.
    pub path: PathBuf,

    /// Seconds between host table reloads.
    pub reload_interval_secs: u64,

    /// Catch-all backend for hosts missing from the table.
    pub default_backend: Option<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config.ini"),
            reload_interval_secs: 60,
            default_backend: None,
        }
    }
}

impl RoutesConfig {
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs.max(1))
    }
}

/// Timeout configuration for backend dispatch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on connecting to the backend, in seconds.
    pub write_secs: u64,

    /// Bound on waiting for the backend's response head, in seconds.
    pub read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            write_secs: 20,
            read_secs: 20,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn response(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Raise the default filter to debug.
    pub verbose: bool,

    /// Output format.
    pub format: LogFormat,
}

/// Parse a listen address, accepting the `:PORT` shorthand for all interfaces.
pub fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    };

    candidate
        .parse()
        .map_err(|source| ConfigError::ListenAddress {
            address: address.to_string(),
            source,
        })
}
