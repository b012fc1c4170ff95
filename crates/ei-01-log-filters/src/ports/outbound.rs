//! Outbound Ports (Driven Ports)
//!
//! Collaborators the log-filter subsystem depends on: the indexed storage it
//! reads, the ingestion sink it writes, and the upstream chain node it copies
//! from. Implementations provide their own connection pooling and
//! concurrency safety.

use async_trait::async_trait;
use shared_types::{BlockBloomRecord, Bloom, Hash, LogRecord};

use crate::error::DataError;

/// Read side of the bloom and log index.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Bloom of the block at `height`, `None` when the height is not indexed.
    async fn bloom_by_height(&self, height: u64) -> Result<Option<Bloom>, DataError>;

    /// Height and bloom of the block with `hash`, `None` when unknown.
    async fn bloom_and_height_by_hash(&self, hash: &Hash)
        -> Result<Option<(u64, Bloom)>, DataError>;

    /// All logs of the block at `height`, in log-index order.
    async fn logs_by_height(&self, height: u64) -> Result<Vec<LogRecord>, DataError>;

    /// Highest indexed height.
    async fn chain_height(&self) -> Result<u64, DataError>;
}

/// Write side used by ingestion.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Insert or replace the bloom entry of one block.
    async fn save_bloom(&self, record: BlockBloomRecord) -> Result<(), DataError>;

    /// Append logs; returns the number stored.
    async fn save_logs(&self, logs: Vec<LogRecord>) -> Result<usize, DataError>;
}

/// A chain node that can be copied into the index.
#[async_trait]
pub trait UpstreamChain: Send + Sync {
    /// Number, hash and logs bloom of the block at `height`.
    async fn block_bloom(&self, height: u64) -> Result<BlockBloomRecord, DataError>;

    /// Every log emitted in `[from, to]`.
    async fn logs_in_range(&self, from: u64, to: u64) -> Result<Vec<LogRecord>, DataError>;
}
