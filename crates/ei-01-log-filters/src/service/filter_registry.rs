//! Installed filters with idle eviction
//!
//! A filter is installed with a deadline of `now + idle_timeout`. Every poll
//! pushes the deadline forward; [`sweep_task`] periodically drops the filters
//! whose deadline has passed. All mutations go through one mutex, and the
//! sweep only ever deletes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{BlockNumberSpec, FilterCriteria, Hash, LogRecord};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{FilterRegistryConfig, QueryConfig};
use crate::error::FilterError;
use crate::ports::LogStore;
use crate::service::range_engine::RangeQueryEngine;

/// Opaque filter handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(String);

impl FilterId {
    fn generate() -> Self {
        Self(format!("0x{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Matches logs against stored criteria
    Logs,
    /// Collects hashes of newly indexed blocks
    Blocks,
}

impl FilterKind {
    fn name(self) -> &'static str {
        match self {
            FilterKind::Logs => "logs",
            FilterKind::Blocks => "blocks",
        }
    }
}

struct FilterEntry {
    kind: FilterKind,
    deadline: Instant,
    criteria: FilterCriteria,
    hashes: Vec<Hash>,
    last_polled: Option<u64>,
}

/// Registry of long-lived filters.
pub struct FilterRegistry {
    filters: Mutex<HashMap<FilterId, FilterEntry>>,
    idle_timeout: Duration,
}

impl FilterRegistry {
    pub fn new(config: &FilterRegistryConfig) -> Self {
        Self {
            filters: Mutex::new(HashMap::new()),
            idle_timeout: config.idle_timeout,
        }
    }

    /// Install a filter and start its idle deadline.
    pub fn install(
        &self,
        kind: FilterKind,
        criteria: FilterCriteria,
    ) -> Result<FilterId, FilterError> {
        if kind == FilterKind::Logs && criteria.block_hash.is_some() {
            return Err(FilterError::InvalidParameters(
                "log filters cannot be pinned to a block hash".into(),
            ));
        }

        let id = FilterId::generate();
        let entry = FilterEntry {
            kind,
            deadline: Instant::now() + self.idle_timeout,
            criteria,
            hashes: Vec::new(),
            last_polled: None,
        };
        self.filters.lock().insert(id.clone(), entry);
        debug!(filter_id = %id, kind = kind.name(), "Installed filter");
        Ok(id)
    }

    /// Remove a filter. Returns false when it was not installed.
    pub fn uninstall(&self, id: &FilterId) -> bool {
        self.filters.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &FilterId) -> bool {
        self.filters.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.filters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refresh the deadline of a filter without polling it.
    pub fn touch(&self, id: &FilterId) -> Result<(), FilterError> {
        let mut filters = self.filters.lock();
        let entry = filters
            .get_mut(id)
            .ok_or_else(|| FilterError::FilterNotFound(id.to_string()))?;
        entry.deadline = Instant::now() + self.idle_timeout;
        Ok(())
    }

    /// Criteria of an installed filter.
    pub fn criteria(&self, id: &FilterId) -> Result<FilterCriteria, FilterError> {
        self.filters
            .lock()
            .get(id)
            .map(|entry| entry.criteria.clone())
            .ok_or_else(|| FilterError::FilterNotFound(id.to_string()))
    }

    /// Queue a newly indexed block hash on every block filter.
    pub fn record_block_hash(&self, hash: Hash) {
        for entry in self.filters.lock().values_mut() {
            if entry.kind == FilterKind::Blocks {
                entry.hashes.push(hash);
            }
        }
    }

    /// Drain the block hashes queued since the last poll.
    pub fn poll_hashes(&self, id: &FilterId) -> Result<Vec<Hash>, FilterError> {
        let mut filters = self.filters.lock();
        let entry = self.checked_entry(&mut filters, id, FilterKind::Blocks)?;
        entry.deadline = Instant::now() + self.idle_timeout;
        Ok(std::mem::take(&mut entry.hashes))
    }

    /// Logs indexed since the previous poll that match the filter.
    ///
    /// The first poll starts at the filter's `fromBlock` (or the head when
    /// unset). A poll covers at most `block_span_limit` heights past its
    /// start, ending at the indexed head or `toBlock`. The filter resumes
    /// after the last height the scan covered, so heights behind an index
    /// gap are picked up once they are indexed. A failed poll leaves the
    /// position unchanged.
    pub async fn poll_logs<S: LogStore>(
        &self,
        id: &FilterId,
        engine: &RangeQueryEngine<S>,
        limits: &QueryConfig,
    ) -> Result<Vec<LogRecord>, FilterError> {
        let (criteria, last_polled) = {
            let mut filters = self.filters.lock();
            let entry = self.checked_entry(&mut filters, id, FilterKind::Logs)?;
            entry.deadline = Instant::now() + self.idle_timeout;
            (entry.criteria.clone(), entry.last_polled)
        };

        let head = engine.chain_height().await?;
        let from = match last_polled {
            Some(polled) => polled.saturating_add(1),
            None => criteria
                .from_block
                .and_then(|b| b.explicit())
                .unwrap_or(head)
                .max(1),
        };
        let to = criteria
            .to_block
            .and_then(|b| b.explicit())
            .map_or(head, |to| to.min(head))
            .min(from.saturating_add(limits.block_span_limit));
        if from > to {
            return Ok(Vec::new());
        }

        let scan = engine
            .scan_window(&criteria, from, to, limits.log_limit)
            .await?;

        if let Some(scanned_to) = scan.scanned_to {
            if let Some(entry) = self.filters.lock().get_mut(id) {
                entry.last_polled = Some(scanned_to);
            }
        }
        Ok(scan.logs)
    }

    /// Drop every filter whose deadline has passed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut filters = self.filters.lock();
        let before = filters.len();
        filters.retain(|_, entry| entry.deadline > now);
        before - filters.len()
    }

    fn checked_entry<'a>(
        &self,
        filters: &'a mut HashMap<FilterId, FilterEntry>,
        id: &FilterId,
        expected: FilterKind,
    ) -> Result<&'a mut FilterEntry, FilterError> {
        let entry = filters
            .get_mut(id)
            .ok_or_else(|| FilterError::FilterNotFound(id.to_string()))?;
        if entry.kind != expected {
            return Err(FilterError::WrongKind {
                id: id.to_string(),
                expected: expected.name(),
            });
        }
        Ok(entry)
    }
}

/// Background task evicting idle filters.
pub async fn sweep_task(registry: Arc<FilterRegistry>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = registry.sweep_expired();
        if removed > 0 {
            debug!(removed = removed, "Evicted idle filters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLogStore;
    use crate::domain::SnowflakeGenerator;
    use crate::error::QueryError;
    use shared_types::{Address, H160};

    const ALICE: Address = H160([0xaa; 20]);

    fn registry(idle: Duration) -> FilterRegistry {
        FilterRegistry::new(&FilterRegistryConfig {
            idle_timeout: idle,
            sweep_interval: Duration::from_secs(60),
        })
    }

    fn log(block_number: u64) -> LogRecord {
        LogRecord {
            address: ALICE,
            topics: vec![],
            data: vec![],
            block_number,
            transaction_hash: Hash::zero(),
            transaction_index: 0,
            block_hash: Hash::repeat_byte(block_number as u8),
            log_index: 0,
            removed: false,
        }
    }

    fn engine_with_blocks(count: u64) -> RangeQueryEngine<InMemoryLogStore> {
        let store = InMemoryLogStore::new(SnowflakeGenerator::new(0).unwrap());
        for number in 1..=count {
            store.insert_block(number, Hash::repeat_byte(number as u8), vec![log(number)]);
        }
        RangeQueryEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_install_and_uninstall() {
        let registry = registry(Duration::from_secs(60));
        let id = registry
            .install(FilterKind::Logs, FilterCriteria::new())
            .unwrap();

        assert!(id.as_str().starts_with("0x"));
        assert!(registry.contains(&id));
        assert!(registry.uninstall(&id));
        assert!(!registry.uninstall(&id), "second uninstall finds nothing");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_log_filter_rejects_block_hash() {
        let registry = registry(Duration::from_secs(60));
        let result = registry.install(
            FilterKind::Logs,
            FilterCriteria::new().with_block_hash(Hash::repeat_byte(1)),
        );
        assert!(matches!(result, Err(FilterError::InvalidParameters(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let registry = registry(Duration::from_secs(600));
        let stale = registry.install(FilterKind::Blocks, FilterCriteria::new()).unwrap();

        tokio::time::advance(Duration::from_secs(400)).await;
        let fresh = registry.install(FilterKind::Blocks, FilterCriteria::new()).unwrap();

        tokio::time::advance(Duration::from_secs(201)).await;
        assert_eq!(registry.sweep_expired(), 1);
        assert!(!registry.contains(&stale));
        assert!(registry.contains(&fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_refreshes_deadline() {
        let registry = registry(Duration::from_secs(600));
        let id = registry.install(FilterKind::Blocks, FilterCriteria::new()).unwrap();

        tokio::time::advance(Duration::from_secs(500)).await;
        registry.poll_hashes(&id).unwrap();
        tokio::time::advance(Duration::from_secs(500)).await;

        assert_eq!(registry.sweep_expired(), 0);
        assert!(registry.contains(&id));

        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(registry.sweep_expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_evicts_in_background() {
        let registry = Arc::new(registry(Duration::from_secs(60)));
        let id = registry.install(FilterKind::Blocks, FilterCriteria::new()).unwrap();

        let handle = tokio::spawn(sweep_task(Arc::clone(&registry), Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert!(!registry.contains(&id));
        handle.abort();
    }

    #[tokio::test]
    async fn test_block_filter_collects_hashes() {
        let registry = registry(Duration::from_secs(60));
        let blocks = registry.install(FilterKind::Blocks, FilterCriteria::new()).unwrap();
        let logs = registry.install(FilterKind::Logs, FilterCriteria::new()).unwrap();

        registry.record_block_hash(Hash::repeat_byte(1));
        registry.record_block_hash(Hash::repeat_byte(2));

        assert_eq!(
            registry.poll_hashes(&blocks).unwrap(),
            vec![Hash::repeat_byte(1), Hash::repeat_byte(2)]
        );
        assert!(registry.poll_hashes(&blocks).unwrap().is_empty());
        assert!(matches!(
            registry.poll_hashes(&logs),
            Err(FilterError::WrongKind { expected: "blocks", .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_logs_returns_only_new_blocks() {
        let registry = registry(Duration::from_secs(60));
        let limits = QueryConfig::default();
        let engine = engine_with_blocks(3);

        let criteria = FilterCriteria::new()
            .with_range(Some(BlockNumberSpec::Number(1)), None)
            .with_addresses([ALICE]);
        let id = registry.install(FilterKind::Logs, criteria).unwrap();

        let first = registry.poll_logs(&id, &engine, &limits).await.unwrap();
        assert_eq!(first.len(), 3);

        assert!(registry.poll_logs(&id, &engine, &limits).await.unwrap().is_empty());

        engine
            .store()
            .insert_block(4, Hash::repeat_byte(4), vec![log(4)]);
        let next = registry.poll_logs(&id, &engine, &limits).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].block_number, 4);
    }

    #[tokio::test]
    async fn test_poll_unknown_filter() {
        let registry = registry(Duration::from_secs(60));
        let engine = engine_with_blocks(1);
        let result = registry
            .poll_logs(&FilterId::from("0xdead"), &engine, &QueryConfig::default())
            .await;
        assert!(matches!(result, Err(FilterError::FilterNotFound(_))));
    }

    #[tokio::test]
    async fn test_poll_surfaces_query_rejections() {
        let registry = registry(Duration::from_secs(60));
        let engine = engine_with_blocks(3);
        let limits = QueryConfig::default().with_log_limit(1);

        let criteria = FilterCriteria::new().with_range(Some(BlockNumberSpec::Number(1)), None);
        let id = registry.install(FilterKind::Logs, criteria).unwrap();

        let result = registry.poll_logs(&id, &engine, &limits).await;
        assert!(matches!(
            result,
            Err(FilterError::Query(QueryError::ResultTooLarge { limit: 1 }))
        ));

        // The failed poll did not move the filter forward.
        let logs = registry
            .poll_logs(&id, &engine, &QueryConfig::default())
            .await
            .unwrap();
        let blocks: Vec<u64> = logs.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_poll_logs_pages_through_long_ranges() {
        let registry = registry(Duration::from_secs(60));
        let engine = engine_with_blocks(5);
        let limits = QueryConfig::default().with_block_span_limit(2);

        let criteria = FilterCriteria::new().with_range(Some(BlockNumberSpec::Number(1)), None);
        let id = registry.install(FilterKind::Logs, criteria).unwrap();

        let mut pages = Vec::new();
        for _ in 0..3 {
            let logs = registry.poll_logs(&id, &engine, &limits).await.unwrap();
            pages.push(logs.iter().map(|l| l.block_number).collect::<Vec<_>>());
        }
        assert_eq!(pages, vec![vec![1, 2, 3], vec![4, 5], vec![]]);

        engine
            .store()
            .insert_block(6, Hash::repeat_byte(6), vec![log(6)]);
        let next = registry.poll_logs(&id, &engine, &limits).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].block_number, 6);
    }

    #[tokio::test]
    async fn test_poll_logs_resumes_after_index_gap() {
        let registry = registry(Duration::from_secs(60));
        let limits = QueryConfig::default();
        let store = InMemoryLogStore::new(SnowflakeGenerator::new(0).unwrap());
        for number in [1, 2, 4] {
            store.insert_block(number, Hash::repeat_byte(number as u8), vec![log(number)]);
        }
        let engine = RangeQueryEngine::new(Arc::new(store));

        let criteria = FilterCriteria::new().with_range(Some(BlockNumberSpec::Number(1)), None);
        let id = registry.install(FilterKind::Logs, criteria).unwrap();

        let first = registry.poll_logs(&id, &engine, &limits).await.unwrap();
        let blocks: Vec<u64> = first.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![1, 2], "scan stops at the missing height 3");

        assert!(registry.poll_logs(&id, &engine, &limits).await.unwrap().is_empty());

        engine
            .store()
            .insert_block(3, Hash::repeat_byte(3), vec![log(3)]);
        let filled = registry.poll_logs(&id, &engine, &limits).await.unwrap();
        let blocks: Vec<u64> = filled.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![3, 4]);
    }
}
