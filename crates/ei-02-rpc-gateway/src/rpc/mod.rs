//! RPC services exposed by the gateway.

pub mod eth;

pub use eth::{EthService, GetLogs, SyncBlockAndLogs, SYNC_SUCCESS};
