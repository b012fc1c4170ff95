//! Log-filter configuration and validation
//!
//! # Example
//!
//! ```toml
//! [query]
//! log_limit = 10000
//! block_span_limit = 10000
//! overhang = 600
//!
//! [filters]
//! idle_timeout = "10m"
//! sweep_interval = "10m"
//!
//! [sync]
//! upstream_url = "http://127.0.0.1:8545"
//! request_timeout = "30s"
//! max_span = 10000
//!
//! [store]
//! machine_id = 1
//! ```

use serde::{Deserialize, Serialize};
use shared_types::encoding::duration;
use std::time::Duration;
use thiserror::Error;

use crate::domain::range::DEFAULT_OVERHANG;
use crate::domain::snowflake::MAX_MACHINE_ID;

/// Default cap on logs returned by one query.
pub const DEFAULT_LOG_LIMIT: usize = 10_000;

/// Default cap on `toBlock - fromBlock`.
pub const DEFAULT_BLOCK_SPAN_LIMIT: u64 = 10_000;

/// Limits applied to every log query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of logs in one response
    pub log_limit: usize,
    /// Maximum distance between the normalised bounds
    pub block_span_limit: u64,
    /// Heights past the indexed head that a range may reach
    pub overhang: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            log_limit: DEFAULT_LOG_LIMIT,
            block_span_limit: DEFAULT_BLOCK_SPAN_LIMIT,
            overhang: DEFAULT_OVERHANG,
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_limit == 0 {
            return Err(ConfigError::InvalidLimit("log_limit cannot be 0".into()));
        }
        Ok(())
    }

    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        self
    }

    pub fn with_block_span_limit(mut self, limit: u64) -> Self {
        self.block_span_limit = limit;
        self
    }

    pub fn with_overhang(mut self, overhang: u64) -> Self {
        self.overhang = overhang;
        self
    }
}

/// Lifetime of installed filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRegistryConfig {
    /// A filter not polled within this window is evicted
    #[serde(with = "duration")]
    pub idle_timeout: Duration,
    /// Period of the eviction sweep
    #[serde(with = "duration")]
    pub sweep_interval: Duration,
}

impl Default for FilterRegistryConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl FilterRegistryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("idle_timeout cannot be 0".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout("sweep_interval cannot be 0".into()));
        }
        Ok(())
    }
}

/// Upstream node used by block synchronisation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// JSON-RPC endpoint; synchronisation is disabled when unset
    pub upstream_url: Option<String>,
    #[serde(with = "duration")]
    pub request_timeout: Duration,
    /// Cap on `toBlock - fromBlock` for one sync call
    pub max_span: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upstream_url: None,
            request_timeout: Duration::from_secs(30),
            max_span: DEFAULT_BLOCK_SPAN_LIMIT,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.upstream_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "upstream_url must be an http(s) URL: {url}"
                )));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.max_span == 0 {
            return Err(ConfigError::InvalidLimit("max_span cannot be 0".into()));
        }
        Ok(())
    }
}

/// Ingestion store settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snowflake machine id, 0..=1023
    pub machine_id: u16,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine_id > MAX_MACHINE_ID {
            return Err(ConfigError::Invalid(format!(
                "machine_id {} exceeds {}",
                self.machine_id, MAX_MACHINE_ID
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
