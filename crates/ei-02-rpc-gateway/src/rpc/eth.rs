//! Exposed `eth_*` operations.

use async_trait::async_trait;
use ei_01_log_filters::{ChainSyncApi, LogQueryApi, SyncError};
use shared_types::{BlockNumberSpec, FilterCriteria, LogRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::dispatch::{MethodDescriptor, Operation, Service};
use crate::domain::{Reply, RpcError, ServiceError};

/// Reply of a completed `eth_syncBlockAndLogs`.
pub const SYNC_SUCCESS: &str = "Sync successful!";

/// The `eth` service: log queries plus on-demand synchronisation.
#[derive(Clone)]
pub struct EthService {
    query: Arc<dyn LogQueryApi>,
    sync: Option<Arc<dyn ChainSyncApi>>,
}

impl EthService {
    pub fn new(query: Arc<dyn LogQueryApi>) -> Self {
        Self { query, sync: None }
    }

    /// Enable `eth_syncBlockAndLogs` against `sync`.
    pub fn with_sync(mut self, sync: Arc<dyn ChainSyncApi>) -> Self {
        self.sync = Some(sync);
        self
    }
}

impl Service for EthService {
    fn name(&self) -> &str {
        "EthService"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::criteria(
                "GetLogs",
                Arc::new(GetLogs {
                    query: Arc::clone(&self.query),
                }),
            ),
            MethodDescriptor::criteria(
                "SyncBlockAndLogs",
                Arc::new(SyncBlockAndLogs {
                    sync: self.sync.clone(),
                }),
            ),
        ]
    }
}

/// eth_getLogs - Returns logs matching the criteria
pub struct GetLogs {
    query: Arc<dyn LogQueryApi>,
}

#[async_trait]
impl Operation for GetLogs {
    #[instrument(skip_all, name = "eth_getLogs")]
    async fn call(&self, params: FilterCriteria, reply: &mut Reply) -> Result<(), ServiceError> {
        if params.is_empty() {
            reply.set_app_error(RpcError::invalid_params("Parameters is empty"));
            return Ok(());
        }

        let started = Instant::now();
        let logs: Vec<LogRecord> = match self.query.get_logs(&params).await {
            Ok(logs) => logs,
            Err(e) if e.is_rejection() => {
                error!(error = %e, criteria = ?params, "eth_getLogs rejected");
                reply.set_app_error(RpcError::invalid_params(e.to_string()));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            logs = logs.len(),
            criteria = ?params,
            "eth_getLogs served"
        );
        reply.set(&logs)
    }
}

/// eth_syncBlockAndLogs - Copies a block range from the upstream node
pub struct SyncBlockAndLogs {
    sync: Option<Arc<dyn ChainSyncApi>>,
}

#[async_trait]
impl Operation for SyncBlockAndLogs {
    #[instrument(skip_all, name = "eth_syncBlockAndLogs")]
    async fn call(&self, params: FilterCriteria, reply: &mut Reply) -> Result<(), ServiceError> {
        let Some(sync) = &self.sync else {
            reply.set_app_error(RpcError::system_error("sync upstream not configured"));
            return Ok(());
        };

        let (from, to) = match (params.from_block, params.to_block) {
            (Some(BlockNumberSpec::Number(from)), Some(BlockNumberSpec::Number(to))) => {
                (from, to)
            }
            _ => {
                reply.set_app_error(RpcError::invalid_params(
                    "fromBlock and toBlock must be explicit block numbers",
                ));
                return Ok(());
            }
        };

        match sync.sync_range(from, to).await {
            Ok(report) => {
                info!(
                    from = report.from_block,
                    to = report.to_block,
                    blocks = report.blocks,
                    logs = report.logs,
                    "Sync complete"
                );
                reply.set(SYNC_SUCCESS)
            }
            Err(e @ SyncError::InvalidRange(_)) => {
                reply.set_app_error(RpcError::invalid_params(e.to_string()));
                Ok(())
            }
            Err(e) => {
                warn!(from, to, error = %e, "Sync failed");
                reply.set_app_error(RpcError::system_error(e.to_string()));
                Ok(())
            }
        }
    }
}
