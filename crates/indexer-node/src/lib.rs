//! # Event Indexer Node
//!
//! Process entry point for the bloom-indexed log query service.
//!
//! ## Modular Structure
//!
//! - `cli/` - command-line arguments
//! - `config/` - TOML file plus environment overrides
//! - `telemetry/` - tracing subscriber setup
//! - `node/` - subsystem wiring, serving and drain
//!
//! ## Wiring
//!
//! ```text
//!   HTTP ──→ ei-02 router ──→ Dispatcher ──→ EthService
//!                                              │      │
//!                                       GetLogs│      │SyncBlockAndLogs
//!                                              ↓      ↓
//!                                LogQueryService    ChainSyncer ──→ upstream node
//!                                              │      │
//!                                              ↓      ↓
//!                                        InMemoryLogStore
//! ```

pub mod cli;
pub mod config;
pub mod node;
pub mod telemetry;

pub use cli::Args;
pub use config::{NodeConfig, NodeConfigError, TelemetryConfig};
pub use node::IndexerNode;
pub use telemetry::init_tracing;
