//! Chain Synchroniser
//!
//! Copies a block range from an upstream node into the index: one bloom
//! record per height, then every log of the range in a single batch.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::DEFAULT_BLOCK_SPAN_LIMIT;
use crate::error::SyncError;
use crate::ports::{ChainSyncApi, LogSink, SyncReport, UpstreamChain};
use crate::service::filter_registry::FilterRegistry;

/// Upstream-to-index copier.
pub struct ChainSyncer<U: UpstreamChain, K: LogSink> {
    upstream: Arc<U>,
    sink: Arc<K>,
    max_span: u64,
    /// Block filters notified of every stored block
    filters: Option<Arc<FilterRegistry>>,
}

impl<U: UpstreamChain, K: LogSink> ChainSyncer<U, K> {
    pub fn new(upstream: Arc<U>, sink: Arc<K>) -> Self {
        Self {
            upstream,
            sink,
            max_span: DEFAULT_BLOCK_SPAN_LIMIT,
            filters: None,
        }
    }

    /// Largest `to - from` accepted by one call.
    pub fn with_max_span(mut self, max_span: u64) -> Self {
        self.max_span = max_span;
        self
    }

    pub fn with_filters(mut self, filters: Arc<FilterRegistry>) -> Self {
        self.filters = Some(filters);
        self
    }
}

#[async_trait]
impl<U: UpstreamChain + 'static, K: LogSink + 'static> ChainSyncApi for ChainSyncer<U, K> {
    async fn sync_range(&self, from: u64, to: u64) -> Result<SyncReport, SyncError> {
        if from > to {
            return Err(SyncError::InvalidRange(format!(
                "fromBlock {from} is after toBlock {to}"
            )));
        }
        if to - from > self.max_span {
            return Err(SyncError::InvalidRange(format!(
                "range {from}..={to} exceeds {} blocks",
                self.max_span
            )));
        }
        info!(from, to, "Syncing block range");

        for height in from..=to {
            let record = self
                .upstream
                .block_bloom(height)
                .await
                .map_err(SyncError::Upstream)?;
            let hash = record.block_hash;
            self.sink
                .save_bloom(record)
                .await
                .map_err(SyncError::Storage)?;
            if let Some(filters) = &self.filters {
                filters.record_block_hash(hash);
            }
            debug!(height, "Stored block bloom");
        }

        let logs = self
            .upstream
            .logs_in_range(from, to)
            .await
            .map_err(SyncError::Upstream)?;
        if logs.iter().any(|log| log.block_number < from || log.block_number > to) {
            warn!(from, to, "Upstream returned logs outside the requested range");
        }
        let stored = self.sink.save_logs(logs).await.map_err(SyncError::Storage)?;

        let report = SyncReport {
            from_block: from,
            to_block: to,
            blocks: (to - from).saturating_add(1),
            logs: stored,
        };
        info!(blocks = report.blocks, logs = report.logs, "Sync complete");
        Ok(report)
    }
}
