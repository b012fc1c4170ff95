//! # EI-01 Log Filters
//!
//! Bloom-indexed event log queries over an indexed chain.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `BloomIndicator`: three (byte, mask) positions per address or topic
//!   - `CandidacyFilter`: per-request bloom test, built once
//!   - `matches` / `filter_logs`: exact address and topic predicate
//!   - `RequestedRange`, `plan_scan`: block range normalisation
//!   - `SnowflakeGenerator`: row ids for ingested records
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `LogQueryApi`, `ChainSyncApi`: driving ports
//!   - `LogStore`, `LogSink`, `UpstreamChain`: driven ports
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `RangeQueryEngine`: single-block and range scans
//!   - `LogQueryService`: implements `LogQueryApi`
//!   - `ChainSyncer`: implements `ChainSyncApi`
//!   - `FilterRegistry`: installed filters with idle eviction
//!
//! - **Adapters Layer** (`adapters/`)
//!   - `InMemoryLogStore`: `LogStore` + `LogSink` in process memory
//!   - `JsonRpcUpstream`: `UpstreamChain` over HTTP JSON-RPC
//!
//! ## Invariants
//!
//! - A block bloom never produces a false negative for the logs it covers.
//! - Every returned log satisfies the criteria exactly, whatever the bloom said.
//! - Topic positions are never reordered: position `i` constrains `topics[i]`.
//!
//! ## Usage Example
//!
//! ```ignore
//! use ei_01_log_filters::{InMemoryLogStore, LogQueryApi, LogQueryService, QueryConfig};
//! use shared_types::FilterCriteria;
//!
//! let store = Arc::new(InMemoryLogStore::new(SnowflakeGenerator::new(0)?));
//! let service = LogQueryService::new(store, QueryConfig::default());
//!
//! let criteria = FilterCriteria::new().with_addresses([contract]);
//! let logs = service.get_logs(&criteria).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{InMemoryLogStore, JsonRpcUpstream};
pub use domain::{
    BloomIndicator, CandidacyFilter, FilterRegistryConfig, QueryConfig, SnowflakeGenerator,
    StoreConfig, SyncConfig,
};
pub use error::{DataError, FilterError, IdError, QueryError, SyncError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{ChainSyncApi, LogQueryApi, LogSink, LogStore, SyncReport, UpstreamChain};
pub use service::{
    sweep_task, ChainSyncer, FilterId, FilterKind, FilterRegistry, LogQueryService,
    RangeQueryEngine, WindowScan,
};
