//! Configuration loading from disk.

use std::fs;
use std::net::AddrParseError;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid listen address {address:?}: {source}")]
    ListenAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },
}

/// Read a file to a string, tagging failures with the path.
pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load proxy settings from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = read_file(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    Ok(config)
}
