//! Range Query Engine
//!
//! Answers one [`FilterCriteria`] against the bloom index.
//!
//! - **Single-block mode** (`blockHash` set and non-zero): resolve the block,
//!   probe its bloom, read and match its logs on a hit.
//! - **Range mode**: normalise the bounds (see [`crate::domain::range`]), then
//!   walk the heights upward. A bloom miss costs one probe and no log read.
//!   A missing bloom ends the scan and the logs gathered so far are returned.
//!
//! Storage faults surface as [`QueryError::Data`]; nothing is retried.

use shared_types::{FilterCriteria, Hash, LogRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::domain::{
    check_span, filter_logs, plan_scan, CandidacyFilter, RequestedRange, ScanPlan,
    DEFAULT_OVERHANG,
};
use crate::error::QueryError;
use crate::metrics::Metrics;
use crate::ports::LogStore;

/// Result of scanning an explicit height window.
#[derive(Debug, Default)]
pub struct WindowScan {
    pub logs: Vec<LogRecord>,
    /// Highest height whose bloom was read. `None` when the first height
    /// of the window was not indexed.
    pub scanned_to: Option<u64>,
}

/// Bloom-indexed log query engine.
pub struct RangeQueryEngine<S: LogStore> {
    store: Arc<S>,
    overhang: u64,
    metrics: Arc<Metrics>,
}

impl<S: LogStore> RangeQueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            overhang: DEFAULT_OVERHANG,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Heights past the indexed head a range may reach.
    pub fn with_overhang(mut self, overhang: u64) -> Self {
        self.overhang = overhang;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run `criteria` with the given result and span limits.
    pub async fn query(
        &self,
        criteria: &FilterCriteria,
        log_limit: usize,
        block_span_limit: u64,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let started = Instant::now();
        let candidacy = CandidacyFilter::from_criteria(criteria);

        let result = match criteria.block_hash.filter(|hash| !hash.is_zero()) {
            Some(hash) => self.query_block(&hash, criteria, &candidacy).await,
            None => {
                self.query_range(criteria, &candidacy, log_limit, block_span_limit)
                    .await
            }
        };

        self.record_outcome(started, result.as_ref().map(Vec::len));
        result
    }

    /// Scan exactly `[from, to]`, ignoring the bounds in `criteria`.
    ///
    /// No span check or overhang clamp is applied; callers size the window.
    /// The scan stops at the first height without a bloom and reports the
    /// last height it covered, so a caller can resume after it.
    pub async fn scan_window(
        &self,
        criteria: &FilterCriteria,
        from: u64,
        to: u64,
        log_limit: usize,
    ) -> Result<WindowScan, QueryError> {
        let started = Instant::now();
        let candidacy = CandidacyFilter::from_criteria(criteria);

        let result = self
            .scan_heights(criteria, &candidacy, from, to, log_limit)
            .await;

        self.record_outcome(started, result.as_ref().map(|scan| scan.logs.len()));
        result
    }

    fn record_outcome(&self, started: Instant, outcome: Result<usize, &QueryError>) {
        match outcome {
            Ok(returned) => self.metrics.record_query(started.elapsed(), returned),
            Err(err) if err.is_rejection() => self.metrics.record_rejection(),
            Err(_) => {}
        }
    }

    async fn query_block(
        &self,
        hash: &Hash,
        criteria: &FilterCriteria,
        candidacy: &CandidacyFilter,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let (height, bloom) = self
            .store
            .bloom_and_height_by_hash(hash)
            .await?
            .ok_or(QueryError::BlockNotFound(*hash))?;

        let hit = candidacy.matches(&bloom);
        self.metrics.record_probe(hit);
        if !hit {
            return Ok(Vec::new());
        }

        self.read_block(height, criteria).await
    }

    async fn query_range(
        &self,
        criteria: &FilterCriteria,
        candidacy: &CandidacyFilter,
        log_limit: usize,
        block_span_limit: u64,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let requested = RequestedRange::from_criteria(criteria);

        // Fully explicit ranges are rejected before touching storage.
        if requested.is_explicit() {
            let (from, to) = requested.resolve(0);
            check_span(from, to, block_span_limit)?;
        }

        let height = self.store.chain_height().await?;
        let (from, to) = requested.resolve(height);
        check_span(from, to, block_span_limit)?;

        let (from, to) = match plan_scan(from, to, height, self.overhang) {
            ScanPlan::Empty => return Ok(Vec::new()),
            ScanPlan::Scan { from, to } => (from, to),
        };

        let scan = self
            .scan_heights(criteria, candidacy, from, to, log_limit)
            .await?;
        Ok(scan.logs)
    }

    async fn scan_heights(
        &self,
        criteria: &FilterCriteria,
        candidacy: &CandidacyFilter,
        from: u64,
        to: u64,
        log_limit: usize,
    ) -> Result<WindowScan, QueryError> {
        let mut scan = WindowScan::default();
        for number in from..=to {
            let Some(bloom) = self.store.bloom_by_height(number).await? else {
                debug!(height = number, "No bloom indexed, ending scan");
                break;
            };
            scan.scanned_to = Some(number);

            let hit = candidacy.matches(&bloom);
            self.metrics.record_probe(hit);
            if !hit {
                continue;
            }

            scan.logs.extend(self.read_block(number, criteria).await?);
            if scan.logs.len() > log_limit {
                return Err(QueryError::ResultTooLarge { limit: log_limit });
            }
        }

        Ok(scan)
    }

    async fn read_block(
        &self,
        height: u64,
        criteria: &FilterCriteria,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let logs = self.store.logs_by_height(height).await?;
        self.metrics.record_block_read();
        Ok(filter_logs(
            logs,
            None,
            None,
            &criteria.addresses,
            &criteria.topics,
        ))
    }

    /// Highest indexed height.
    pub async fn chain_height(&self) -> Result<u64, QueryError> {
        Ok(self.store.chain_height().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{bloom_for_logs, matches};
    use crate::error::DataError;
    use async_trait::async_trait;
    use shared_types::{Address, BlockNumberSpec, Bloom, H160, H256};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Store double that counts every read and can be told to fail.
    #[derive(Default)]
    struct MockStore {
        height: u64,
        blooms: HashMap<u64, Bloom>,
        hashes: HashMap<Hash, u64>,
        logs: HashMap<u64, Vec<LogRecord>>,
        bloom_reads: AtomicUsize,
        log_reads: AtomicUsize,
        height_reads: AtomicUsize,
        fail_logs: AtomicBool,
    }

    impl MockStore {
        fn with_height(height: u64) -> Self {
            Self {
                height,
                ..Default::default()
            }
        }

        /// Index `[1, height]` with empty blocks.
        fn filled(height: u64) -> Self {
            let mut store = Self::with_height(height);
            for number in 1..=height {
                store.add_block(number, vec![]);
            }
            store
        }

        fn add_block(&mut self, number: u64, logs: Vec<LogRecord>) {
            self.blooms.insert(number, bloom_for_logs(&logs));
            self.hashes.insert(block_hash(number), number);
            self.logs.insert(number, logs);
        }

        fn reads(&self) -> usize {
            self.bloom_reads.load(Ordering::SeqCst)
                + self.log_reads.load(Ordering::SeqCst)
                + self.height_reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogStore for MockStore {
        async fn bloom_by_height(&self, height: u64) -> Result<Option<Bloom>, DataError> {
            self.bloom_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.blooms.get(&height).copied())
        }

        async fn bloom_and_height_by_hash(
            &self,
            hash: &Hash,
        ) -> Result<Option<(u64, Bloom)>, DataError> {
            self.bloom_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .hashes
                .get(hash)
                .and_then(|n| self.blooms.get(n).map(|bloom| (*n, *bloom))))
        }

        async fn logs_by_height(&self, height: u64) -> Result<Vec<LogRecord>, DataError> {
            self.log_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_logs.load(Ordering::SeqCst) {
                return Err(DataError::ConnectionError("connection reset".into()));
            }
            Ok(self.logs.get(&height).cloned().unwrap_or_default())
        }

        async fn chain_height(&self) -> Result<u64, DataError> {
            self.height_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.height)
        }
    }

    const ALICE: Address = H160([0xaa; 20]);
    const BOB: Address = H160([0xbb; 20]);
    const TRANSFER: Hash = H256([0x01; 32]);
    const APPROVAL: Hash = H256([0x02; 32]);

    fn block_hash(number: u64) -> Hash {
        let mut bytes = [0xffu8; 32];
        bytes[24..].copy_from_slice(&number.to_be_bytes());
        H256(bytes)
    }

    fn log(block_number: u64, log_index: u64, address: Address, topics: Vec<Hash>) -> LogRecord {
        LogRecord {
            address,
            topics,
            data: vec![0x01],
            block_number,
            transaction_hash: Hash::repeat_byte(0x33),
            transaction_index: 0,
            block_hash: block_hash(block_number),
            log_index,
            removed: false,
        }
    }

    fn range(from: u64, to: u64) -> FilterCriteria {
        FilterCriteria::new().with_range(
            Some(BlockNumberSpec::Number(from)),
            Some(BlockNumberSpec::Number(to)),
        )
    }

    fn engine(store: MockStore) -> RangeQueryEngine<MockStore> {
        RangeQueryEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_range_returns_matching_logs_in_order() {
        let mut store = MockStore::filled(10);
        store.add_block(3, vec![log(3, 0, ALICE, vec![TRANSFER]), log(3, 1, BOB, vec![])]);
        store.add_block(7, vec![log(7, 0, ALICE, vec![APPROVAL])]);
        let engine = engine(store);

        let criteria = range(1, 10).with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        let found: Vec<(u64, u64)> = logs.iter().map(|l| (l.block_number, l.log_index)).collect();
        assert_eq!(found, vec![(3, 0), (7, 0)]);
    }

    #[tokio::test]
    async fn test_bloom_miss_skips_log_read() {
        let mut store = MockStore::filled(20);
        store.add_block(15, vec![log(15, 0, ALICE, vec![TRANSFER])]);
        let engine = engine(store);

        let criteria = range(1, 20).with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 20);
        assert_eq!(
            engine.store().log_reads.load(Ordering::SeqCst),
            1,
            "only the candidate block is read"
        );
        assert_eq!(engine.metrics().snapshot().bloom_hits, 1);
    }

    #[tokio::test]
    async fn test_exactness_despite_candidate_blocks() {
        // Block 4 carries both ALICE and TRANSFER, but never on the same log.
        let mut store = MockStore::filled(5);
        store.add_block(4, vec![log(4, 0, ALICE, vec![APPROVAL]), log(4, 1, BOB, vec![TRANSFER])]);
        let engine = engine(store);

        let criteria = range(1, 5)
            .with_addresses([ALICE])
            .with_topics(vec![vec![TRANSFER]]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert!(logs.is_empty());
        assert_eq!(engine.store().log_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unset_bounds_query_the_head() {
        let mut store = MockStore::filled(100);
        store.add_block(99, vec![log(99, 0, ALICE, vec![])]);
        store.add_block(100, vec![log(100, 0, ALICE, vec![])]);
        let engine = engine(store);

        let criteria = FilterCriteria::new().with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 100);
    }

    #[tokio::test]
    async fn test_zero_from_block_starts_at_one() {
        let mut store = MockStore::filled(3);
        store.add_block(1, vec![log(1, 0, ALICE, vec![])]);
        let engine = engine(store);

        let logs = engine
            .query(&range(0, 3).with_addresses([ALICE]), 100, 100)
            .await
            .unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_oversized_span_performs_no_reads() {
        let engine = engine(MockStore::filled(10));

        let result = engine
            .query(&range(1, 50_000).with_addresses([ALICE]), 100, 10_000)
            .await;

        assert!(matches!(result, Err(QueryError::RangeTooLarge { limit: 10_000 })));
        assert_eq!(engine.store().reads(), 0, "span check precedes storage access");
        assert_eq!(engine.metrics().snapshot().queries_rejected, 1);
    }

    #[tokio::test]
    async fn test_span_check_applies_to_defaulted_bounds() {
        let engine = engine(MockStore::filled(20_000));

        let criteria = FilterCriteria::new()
            .with_range(Some(BlockNumberSpec::Number(1)), None)
            .with_addresses([ALICE]);
        let result = engine.query(&criteria, 100, 10_000).await;

        assert!(matches!(result, Err(QueryError::RangeTooLarge { .. })));
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_future_range_is_empty() {
        let engine = engine(MockStore::filled(100));

        let logs = engine.query(&range(150, 200), 100, 100).await.unwrap();

        assert!(logs.is_empty());
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_end_is_clamped_to_overhang() {
        // Only [1, 100] is indexed, so nothing past 100 is ever probed.
        let engine = engine(MockStore::filled(100)).with_overhang(5);

        let logs = engine.query(&range(98, 1_100), 100, 10_000).await.unwrap();

        assert!(logs.is_empty());
        assert_eq!(
            engine.store().bloom_reads.load(Ordering::SeqCst),
            4,
            "98, 99, 100 then the gap at 101"
        );
    }

    #[tokio::test]
    async fn test_overhang_bounds_probes_past_the_head() {
        let mut store = MockStore::filled(100);
        // Blocks beyond the reported head keep the scan running.
        for number in 101..=800 {
            store.add_block(number, vec![]);
        }
        let engine = engine(store);

        let logs = engine.query(&range(100, 1_100), 100, 10_000).await.unwrap();

        assert!(logs.is_empty());
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 601);
    }

    #[tokio::test]
    async fn test_gap_returns_accumulated_logs() {
        let mut store = MockStore::with_height(10);
        store.add_block(1, vec![log(1, 0, ALICE, vec![])]);
        store.add_block(2, vec![log(2, 0, ALICE, vec![])]);
        // 3 is missing
        store.add_block(4, vec![log(4, 0, ALICE, vec![])]);
        let engine = engine(store);

        let logs = engine
            .query(&range(1, 10).with_addresses([ALICE]), 100, 100)
            .await
            .unwrap();

        let blocks: Vec<u64> = logs.iter().map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![1, 2]);
        assert_eq!(engine.store().bloom_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scan_window_reports_last_indexed_height() {
        let mut store = MockStore::with_height(10);
        store.add_block(4, vec![log(4, 0, ALICE, vec![])]);
        store.add_block(5, vec![]);
        // 6 is missing
        store.add_block(7, vec![log(7, 0, ALICE, vec![])]);
        let engine = engine(store);

        let criteria = FilterCriteria::new().with_addresses([ALICE]);
        let scan = engine.scan_window(&criteria, 4, 9, 100).await.unwrap();
        assert_eq!(scan.logs.len(), 1);
        assert_eq!(scan.scanned_to, Some(5));

        let empty = engine.scan_window(&criteria, 6, 9, 100).await.unwrap();
        assert!(empty.logs.is_empty());
        assert_eq!(empty.scanned_to, None);
        assert_eq!(engine.metrics().snapshot().queries_completed, 2);
    }

    #[tokio::test]
    async fn test_result_cap_discards_partial_result() {
        let mut store = MockStore::filled(4);
        store.add_block(2, vec![log(2, 0, ALICE, vec![]), log(2, 1, ALICE, vec![])]);
        store.add_block(3, vec![log(3, 0, ALICE, vec![])]);
        let engine = engine(store);

        let criteria = range(1, 4).with_addresses([ALICE]);
        let result = engine.query(&criteria, 2, 100).await;
        assert!(matches!(result, Err(QueryError::ResultTooLarge { limit: 2 })));

        let logs = engine.query(&criteria, 3, 100).await.unwrap();
        assert_eq!(logs.len(), 3, "exactly at the limit is allowed");
    }

    #[tokio::test]
    async fn test_block_hash_mode() {
        let mut store = MockStore::filled(5);
        store.add_block(4, vec![log(4, 0, ALICE, vec![TRANSFER]), log(4, 1, BOB, vec![])]);
        let engine = engine(store);

        let criteria = FilterCriteria::new()
            .with_block_hash(block_hash(4))
            .with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(engine.store().height_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_block_hash_miss_reads_no_logs() {
        let mut store = MockStore::filled(5);
        store.add_block(4, vec![log(4, 0, BOB, vec![])]);
        let engine = engine(store);

        let criteria = FilterCriteria::new()
            .with_block_hash(block_hash(4))
            .with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert!(logs.is_empty());
        assert_eq!(engine.store().log_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_block_hash() {
        let engine = engine(MockStore::filled(5));

        let unknown = Hash::repeat_byte(0x77);
        let result = engine
            .query(&FilterCriteria::new().with_block_hash(unknown), 100, 100)
            .await;

        assert!(matches!(result, Err(QueryError::BlockNotFound(hash)) if hash == unknown));
    }

    #[tokio::test]
    async fn test_zero_block_hash_uses_range_mode() {
        let mut store = MockStore::filled(3);
        store.add_block(3, vec![log(3, 0, ALICE, vec![])]);
        let engine = engine(store);

        let criteria = FilterCriteria::new()
            .with_block_hash(Hash::zero())
            .with_addresses([ALICE]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(engine.store().height_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_storage_fault_propagates() {
        let mut store = MockStore::filled(3);
        store.add_block(2, vec![log(2, 0, ALICE, vec![])]);
        store.fail_logs.store(true, Ordering::SeqCst);
        let engine = engine(store);

        let result = engine.query(&range(1, 3).with_addresses([ALICE]), 100, 100).await;

        match result {
            Err(err @ QueryError::Data(_)) => assert!(!err.is_rejection()),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert_eq!(engine.metrics().snapshot().queries_rejected, 0);
    }

    #[tokio::test]
    async fn test_every_result_satisfies_criteria() {
        let mut store = MockStore::filled(30);
        for number in 1..=30u64 {
            let address = if number % 2 == 0 { ALICE } else { BOB };
            let topic = if number % 3 == 0 { TRANSFER } else { APPROVAL };
            store.add_block(number, vec![log(number, 0, address, vec![topic, APPROVAL])]);
        }
        let engine = engine(store);

        let criteria = range(1, 30)
            .with_addresses([ALICE])
            .with_topics(vec![vec![TRANSFER], vec![]]);
        let logs = engine.query(&criteria, 100, 100).await.unwrap();

        assert_eq!(logs.len(), 5, "multiples of six");
        assert!(logs
            .iter()
            .all(|l| matches(l, &criteria.addresses, &criteria.topics)));
    }
}
