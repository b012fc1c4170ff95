//! Node configuration.
//!
//! Read from an optional TOML file, then overridden by environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `EI_RPC_ADDR` | `gateway.http` (`host:port`) |
//! | `EI_SYNC_RPC_ADDR`, `SyncRpcAddr` | `sync.upstream_url` |
//! | `EI_LOG_LEVEL` | `telemetry.level` |
//! | `EI_JSON_LOGS` | `telemetry.json_logs` |
//! | `EI_MACHINE_ID` | `store.machine_id` |
//!
//! # Example
//!
//! ```toml
//! [gateway.http]
//! host = "127.0.0.1"
//! port = 8545
//!
//! [gateway.timeouts]
//! request = "300s"
//! drain_grace = "5s"
//!
//! [query]
//! log_limit = 10000
//! block_span_limit = 10000
//!
//! [telemetry]
//! level = "info"
//! json_logs = false
//! ```

use ei_01_log_filters::{FilterRegistryConfig, QueryConfig, StoreConfig, SyncConfig};
use ei_02_rpc_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "EI_CONFIG";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// One JSON object per line instead of human-readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Full node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub gateway: GatewayConfig,
    pub query: QueryConfig,
    pub sync: SyncConfig,
    pub filters: FilterRegistryConfig,
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Error)]
pub enum NodeConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Parse a TOML document; missing sections keep their defaults.
    pub fn parse(content: &str) -> Result<Self, NodeConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, NodeConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| NodeConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// File (if any), then process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), NodeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EI_RPC_ADDR") {
            let addr: SocketAddr = value.parse().map_err(|_| NodeConfigError::Env {
                var: "EI_RPC_ADDR",
                value: value.clone(),
            })?;
            self.gateway.http.host = addr.ip();
            self.gateway.http.port = addr.port();
        }

        if let Some(value) = lookup("EI_SYNC_RPC_ADDR").or_else(|| lookup("SyncRpcAddr")) {
            self.sync.upstream_url = (!value.is_empty()).then_some(value);
        }

        if let Some(value) = lookup("EI_LOG_LEVEL") {
            self.telemetry.level = value;
        }

        if let Some(value) = lookup("EI_JSON_LOGS") {
            self.telemetry.json_logs = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(NodeConfigError::Env {
                        var: "EI_JSON_LOGS",
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("EI_MACHINE_ID") {
            self.store.machine_id = value.parse().map_err(|_| NodeConfigError::Env {
                var: "EI_MACHINE_ID",
                value: value.clone(),
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), NodeConfigError> {
        let invalid = |e: &dyn std::fmt::Display| NodeConfigError::Invalid(e.to_string());
        self.gateway.validate().map_err(|e| invalid(&e))?;
        self.query.validate().map_err(|e| invalid(&e))?;
        self.sync.validate().map_err(|e| invalid(&e))?;
        self.filters.validate().map_err(|e| invalid(&e))?;
        self.store.validate().map_err(|e| invalid(&e))?;
        Ok(())
    }
}
