//! Subsystem wiring and lifecycle.
//!
//! ## Startup Sequence
//!
//! 1. Create the in-memory index with a snowflake id allocator
//! 2. Create the query service and the filter registry
//! 3. Create the chain syncer if an upstream node is configured
//! 4. Register the `eth` service and build the router
//!
//! ## Shutdown Sequence
//!
//! 1. Raise the drain flag; new requests are refused
//! 2. Wait the drain grace period
//! 3. Stop accepting connections and finish in-flight requests

use anyhow::{Context, Result};
use axum::Router;
use ei_01_log_filters::{
    sweep_task, ChainSyncer, FilterRegistry, InMemoryLogStore, JsonRpcUpstream, LogQueryService,
    SnowflakeGenerator,
};
use ei_02_rpc_gateway::{
    build_router, serve, Dispatcher, DrainHandle, EthService, ServiceRegistry,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// A wired indexer ready to serve.
pub struct IndexerNode {
    config: NodeConfig,
    store: Arc<InMemoryLogStore>,
    query: Arc<LogQueryService<InMemoryLogStore>>,
    filters: Arc<FilterRegistry>,
    dispatcher: Arc<Dispatcher>,
    drain: DrainHandle,
}

impl IndexerNode {
    pub fn build(config: NodeConfig) -> Result<Self> {
        let ids = SnowflakeGenerator::new(config.store.machine_id)
            .context("invalid snowflake machine id")?;
        let store = Arc::new(InMemoryLogStore::new(ids));

        let query = Arc::new(LogQueryService::new(Arc::clone(&store), config.query.clone()));
        let filters = Arc::new(FilterRegistry::new(&config.filters));

        let mut eth = EthService::new(query.clone());
        if let Some(url) = &config.sync.upstream_url {
            let upstream = JsonRpcUpstream::new(url.clone(), config.sync.request_timeout)
                .context("failed to create upstream client")?;
            let syncer = ChainSyncer::new(Arc::new(upstream), Arc::clone(&store))
                .with_max_span(config.sync.max_span)
                .with_filters(Arc::clone(&filters));
            eth = eth.with_sync(Arc::new(syncer));
            info!(upstream = %url, "Block synchronisation enabled");
        } else {
            info!("No upstream configured; eth_syncBlockAndLogs is disabled");
        }

        let mut registry = ServiceRegistry::new();
        registry
            .register(&eth)
            .context("failed to register eth service")?;
        let dispatcher = Arc::new(Dispatcher::new(registry).context("no service registered")?);

        Ok(Self {
            config,
            store,
            query,
            filters,
            dispatcher,
            drain: DrainHandle::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<InMemoryLogStore> {
        &self.store
    }

    pub fn filters(&self) -> &Arc<FilterRegistry> {
        &self.filters
    }

    pub fn drain_handle(&self) -> DrainHandle {
        self.drain.clone()
    }

    pub fn router(&self) -> Router {
        build_router(
            Arc::clone(&self.dispatcher),
            self.drain.clone(),
            &self.config.gateway,
        )
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.gateway.http_addr();
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = tokio::spawn(sweep_task(
            Arc::clone(&self.filters),
            self.config.filters.sweep_interval,
        ));

        let drain = self.drain.clone();
        let grace = self.config.gateway.timeouts.drain_grace;
        let graceful = async move {
            shutdown.await;
            if drain.drain() {
                info!(grace_ms = grace.as_millis() as u64, "Draining requests");
            }
            tokio::time::sleep(grace).await;
        };

        let result = serve(listener, self.router(), graceful).await;
        sweeper.abort();

        let metrics = self.query.metrics().snapshot();
        info!(
            queries = metrics.queries_completed,
            rejected = metrics.queries_rejected,
            logs = metrics.logs_returned,
            "Query totals"
        );

        if let Err(e) = &result {
            warn!(error = %e, "Server exited with error");
        }
        result.context("JSON-RPC server failed")
    }
}
