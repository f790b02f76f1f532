use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis_common::Hash;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("cannot install subscriber: {0}")]
    Subscriber(String),
}

/// Kernel settings, read from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Network the validator ids are scoped to.
    pub network_id: Hash,
    /// Log the round graph dump at debug level after every load.
    pub log_graph_on_load: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            network_id: Hash::default(),
            log_graph_on_load: true,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl KernelConfig {
    pub fn for_network(network_id: Hash) -> Self {
        KernelConfig {
            network_id,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}
