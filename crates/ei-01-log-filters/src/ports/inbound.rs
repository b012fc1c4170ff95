//! Inbound Ports (Driving Ports)
//!
//! The API the RPC layer calls into.

use async_trait::async_trait;
use serde::Serialize;
use shared_types::{FilterCriteria, LogRecord};

use crate::error::{QueryError, SyncError};

/// Log query API
#[async_trait]
pub trait LogQueryApi: Send + Sync {
    /// Run `criteria` against the index with the configured limits.
    async fn get_logs(&self, criteria: &FilterCriteria) -> Result<Vec<LogRecord>, QueryError>;
}

/// Outcome of one synchronisation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub from_block: u64,
    pub to_block: u64,
    pub blocks: u64,
    pub logs: usize,
}

/// Chain synchronisation API
#[async_trait]
pub trait ChainSyncApi: Send + Sync {
    /// Copy blooms and logs of `[from, to]` from upstream into the index.
    async fn sync_range(&self, from: u64, to: u64) -> Result<SyncReport, SyncError>;
}
