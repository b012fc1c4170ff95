//! Exact log matching
//!
//! The bloom pre-filter only narrows the set of blocks worth reading; every
//! returned log passes through [`matches`] so bloom false positives never
//! leak to the caller.

use shared_types::{Address, Hash, LogRecord};

/// Exact address/topic predicate.
///
/// - a non-empty `addresses` set must contain the log's address
/// - `topics` longer than the log's topic list never matches
/// - position `i` is a wildcard when empty, otherwise `log.topics[i]` must be
///   one of its members
pub fn matches(log: &LogRecord, addresses: &[Address], topics: &[Vec<Hash>]) -> bool {
    if !addresses.is_empty() && !addresses.contains(&log.address) {
        return false;
    }
    if topics.len() > log.topics.len() {
        return false;
    }
    topics
        .iter()
        .zip(log.topics.iter())
        .all(|(wanted, actual)| wanted.is_empty() || wanted.contains(actual))
}

/// Batch form of [`matches`] with optional inclusive block bounds.
pub fn filter_logs(
    logs: Vec<LogRecord>,
    from_block: Option<u64>,
    to_block: Option<u64>,
    addresses: &[Address],
    topics: &[Vec<Hash>],
) -> Vec<LogRecord> {
    logs.into_iter()
        .filter(|log| from_block.map_or(true, |from| log.block_number >= from))
        .filter(|log| to_block.map_or(true, |to| log.block_number <= to))
        .filter(|log| matches(log, addresses, topics))
        .collect()
}
