//! Log Query Service
//!
//! Implements [`LogQueryApi`] by running the range engine with the
//! configured limits.

use async_trait::async_trait;
use shared_types::{FilterCriteria, LogRecord};
use std::sync::Arc;

use crate::domain::QueryConfig;
use crate::error::QueryError;
use crate::metrics::Metrics;
use crate::ports::{LogQueryApi, LogStore};
use crate::service::range_engine::RangeQueryEngine;

pub struct LogQueryService<S: LogStore> {
    engine: Arc<RangeQueryEngine<S>>,
    config: QueryConfig,
}

impl<S: LogStore> LogQueryService<S> {
    pub fn new(store: Arc<S>, config: QueryConfig) -> Self {
        let engine = RangeQueryEngine::new(store).with_overhang(config.overhang);
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    /// Share an existing engine, e.g. with the filter registry.
    pub fn with_engine(engine: Arc<RangeQueryEngine<S>>, config: QueryConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &Arc<RangeQueryEngine<S>> {
        &self.engine
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.engine.metrics()
    }
}

#[async_trait]
impl<S: LogStore + 'static> LogQueryApi for LogQueryService<S> {
    async fn get_logs(&self, criteria: &FilterCriteria) -> Result<Vec<LogRecord>, QueryError> {
        self.engine
            .query(criteria, self.config.log_limit, self.config.block_span_limit)
            .await
    }
}
