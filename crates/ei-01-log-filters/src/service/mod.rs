//! Service Layer
//!
//! Orchestrates the domain logic against the ports.

pub mod chain_syncer;
pub mod filter_registry;
pub mod log_query_service;
pub mod range_engine;

pub use chain_syncer::ChainSyncer;
pub use filter_registry::{sweep_task, FilterId, FilterKind, FilterRegistry};
pub use log_query_service::LogQueryService;
pub use range_engine::{RangeQueryEngine, WindowScan};
