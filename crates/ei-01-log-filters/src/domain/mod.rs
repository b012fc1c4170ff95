//! Domain layer: pure logic, no I/O.

pub mod bloom_indicator;
pub mod config;
pub mod matcher;
pub mod range;
pub mod snowflake;

pub use bloom_indicator::{bloom_for_logs, BloomIndicator, CandidacyFilter};
pub use config::{
    ConfigError, FilterRegistryConfig, QueryConfig, StoreConfig, SyncConfig,
    DEFAULT_BLOCK_SPAN_LIMIT, DEFAULT_LOG_LIMIT,
};
pub use matcher::{filter_logs, matches};
pub use range::{check_span, plan_scan, RequestedRange, ScanPlan, DEFAULT_OVERHANG};
pub use snowflake::SnowflakeGenerator;
