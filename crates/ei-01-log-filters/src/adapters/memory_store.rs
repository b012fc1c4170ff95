//! In-memory bloom and log index
//!
//! Implements both [`LogStore`] and [`LogSink`]. Every stored row carries a
//! snowflake id assigned at write time.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockBloomRecord, Bloom, Hash, LogRecord};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::domain::bloom_indicator::bloom_for_logs;
use crate::domain::snowflake::SnowflakeGenerator;
use crate::error::DataError;
use crate::ports::{LogSink, LogStore};

#[derive(Clone, Debug)]
struct Row<T> {
    id: u64,
    record: T,
}

#[derive(Default)]
struct Tables {
    blooms: BTreeMap<u64, Row<BlockBloomRecord>>,
    heights_by_hash: HashMap<Hash, u64>,
    /// Rows per block, keyed by log index.
    logs: BTreeMap<u64, BTreeMap<u64, Row<LogRecord>>>,
}

/// Index held entirely in process memory.
pub struct InMemoryLogStore {
    tables: RwLock<Tables>,
    ids: SnowflakeGenerator,
}

impl InMemoryLogStore {
    pub fn new(ids: SnowflakeGenerator) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            ids,
        }
    }

    /// Index one block: stores its logs and the bloom built from them.
    pub fn insert_block(&self, number: u64, hash: Hash, logs: Vec<LogRecord>) {
        let bloom = bloom_for_logs(&logs);
        self.put_bloom(BlockBloomRecord {
            block_number: number,
            block_hash: hash,
            bloom,
        });
        self.put_logs(logs);
    }

    pub fn block_count(&self) -> usize {
        self.tables.read().blooms.len()
    }

    pub fn log_count(&self) -> usize {
        self.tables.read().logs.values().map(BTreeMap::len).sum()
    }

    /// Row id of the bloom stored at `height`.
    pub fn bloom_row_id(&self, height: u64) -> Option<u64> {
        self.tables.read().blooms.get(&height).map(|row| row.id)
    }

    fn put_bloom(&self, record: BlockBloomRecord) {
        let mut tables = self.tables.write();
        let height = record.block_number;
        let hash = record.block_hash;

        let id = match tables.blooms.get(&height) {
            Some(existing) => existing.id,
            None => self.ids.next_id(),
        };
        if let Some(previous) = tables.blooms.insert(height, Row { id, record }) {
            if previous.record.block_hash != hash {
                tables.heights_by_hash.remove(&previous.record.block_hash);
            }
        }
        tables.heights_by_hash.insert(hash, height);
    }

    fn put_logs(&self, logs: Vec<LogRecord>) -> usize {
        let count = logs.len();
        let mut tables = self.tables.write();
        for log in logs {
            let rows = tables.logs.entry(log.block_number).or_default();
            match rows.get_mut(&log.log_index) {
                Some(row) => row.record = log,
                None => {
                    let id = self.ids.next_id();
                    rows.insert(log.log_index, Row { id, record: log });
                }
            }
        }
        count
    }

    /// Row id of the log stored at `(height, log_index)`.
    pub fn log_row_id(&self, height: u64, log_index: u64) -> Option<u64> {
        self.tables
            .read()
            .logs
            .get(&height)
            .and_then(|rows| rows.get(&log_index))
            .map(|row| row.id)
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn bloom_by_height(&self, height: u64) -> Result<Option<Bloom>, DataError> {
        Ok(self
            .tables
            .read()
            .blooms
            .get(&height)
            .map(|row| row.record.bloom))
    }

    async fn bloom_and_height_by_hash(
        &self,
        hash: &Hash,
    ) -> Result<Option<(u64, Bloom)>, DataError> {
        let tables = self.tables.read();
        Ok(tables
            .heights_by_hash
            .get(hash)
            .and_then(|height| tables.blooms.get(height))
            .map(|row| (row.record.block_number, row.record.bloom)))
    }

    async fn logs_by_height(&self, height: u64) -> Result<Vec<LogRecord>, DataError> {
        Ok(self
            .tables
            .read()
            .logs
            .get(&height)
            .map(|rows| rows.values().map(|row| row.record.clone()).collect())
            .unwrap_or_default())
    }

    async fn chain_height(&self) -> Result<u64, DataError> {
        Ok(self
            .tables
            .read()
            .blooms
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl LogSink for InMemoryLogStore {
    async fn save_bloom(&self, record: BlockBloomRecord) -> Result<(), DataError> {
        debug!(height = record.block_number, "Saving block bloom");
        self.put_bloom(record);
        Ok(())
    }

    async fn save_logs(&self, logs: Vec<LogRecord>) -> Result<usize, DataError> {
        let stored = self.put_logs(logs);
        debug!(count = stored, "Saved logs");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BloomIndicator;
    use shared_types::Address;

    fn store() -> InMemoryLogStore {
        InMemoryLogStore::new(SnowflakeGenerator::new(1).unwrap())
    }

    fn log(block_number: u64, log_index: u64, address: Address) -> LogRecord {
        LogRecord {
            address,
            topics: vec![Hash::repeat_byte(0x01)],
            data: vec![],
            block_number,
            transaction_hash: Hash::zero(),
            transaction_index: 0,
            block_hash: Hash::repeat_byte(block_number as u8),
            log_index,
            removed: false,
        }
    }

    #[tokio::test]
    async fn test_insert_block_builds_bloom() {
        let store = store();
        let alice = Address::repeat_byte(0xaa);
        store.insert_block(5, Hash::repeat_byte(5), vec![log(5, 0, alice)]);

        let bloom = store.bloom_by_height(5).await.unwrap().unwrap();
        assert!(BloomIndicator::for_address(&alice).may_be_in(&bloom));
        assert_eq!(store.chain_height().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_missing_heights_report_none() {
        let store = store();
        assert!(store.bloom_by_height(1).await.unwrap().is_none());
        assert!(store
            .bloom_and_height_by_hash(&Hash::repeat_byte(0x99))
            .await
            .unwrap()
            .is_none());
        assert!(store.logs_by_height(1).await.unwrap().is_empty());
        assert_eq!(store.chain_height().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_by_hash() {
        let store = store();
        let hash = Hash::repeat_byte(0x42);
        store.insert_block(9, hash, vec![]);

        let (height, bloom) = store.bloom_and_height_by_hash(&hash).await.unwrap().unwrap();
        assert_eq!(height, 9);
        assert!(bloom.is_zero());
    }

    #[tokio::test]
    async fn test_rewriting_a_height_replaces_its_hash() {
        let store = store();
        store.insert_block(3, Hash::repeat_byte(0x01), vec![]);
        let first_id = store.bloom_row_id(3).unwrap();
        store.insert_block(3, Hash::repeat_byte(0x02), vec![]);

        assert_eq!(store.bloom_row_id(3), Some(first_id), "row id is stable");
        assert!(store
            .bloom_and_height_by_hash(&Hash::repeat_byte(0x01))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.block_count(), 1);
    }

    #[tokio::test]
    async fn test_save_logs_orders_and_deduplicates() {
        let store = store();
        let alice = Address::repeat_byte(0xaa);
        store
            .save_logs(vec![log(7, 2, alice), log(7, 0, alice), log(7, 1, alice)])
            .await
            .unwrap();
        store.save_logs(vec![log(7, 1, alice)]).await.unwrap();

        let logs = store.logs_by_height(7).await.unwrap();
        let indexes: Vec<u64> = logs.iter().map(|l| l.log_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(store.log_count(), 3);
    }

    #[tokio::test]
    async fn test_batches_across_blocks_keep_per_block_order() {
        let store = store();
        let alice = Address::repeat_byte(0xaa);
        store
            .save_logs(vec![log(8, 1, alice), log(9, 3, alice), log(8, 0, alice)])
            .await
            .unwrap();
        let first_id = store.log_row_id(8, 1).unwrap();

        store
            .save_logs(vec![log(9, 0, alice), log(8, 1, alice)])
            .await
            .unwrap();

        let block_8: Vec<u64> = store
            .logs_by_height(8)
            .await
            .unwrap()
            .iter()
            .map(|l| l.log_index)
            .collect();
        let block_9: Vec<u64> = store
            .logs_by_height(9)
            .await
            .unwrap()
            .iter()
            .map(|l| l.log_index)
            .collect();
        assert_eq!(block_8, vec![0, 1]);
        assert_eq!(block_9, vec![0, 3]);
        assert_eq!(store.log_row_id(8, 1), Some(first_id), "rewrites keep the row id");
        assert_eq!(store.log_count(), 4);
    }
}
