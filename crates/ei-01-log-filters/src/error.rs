//! Error types for the log-filter subsystem

use shared_types::Hash;
use thiserror::Error;

/// Errors from storage, ingestion and upstream collaborators
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upstream error {code}: {message}")]
    Upstream { code: i64, message: String },
}

/// Errors returned by a log query
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown block hash {0:?}")]
    BlockNotFound(Hash),

    #[error("maximum [from, to] blocks distance: {limit}")]
    RangeTooLarge { limit: u64 },

    #[error("query returned more than {limit} results")]
    ResultTooLarge { limit: usize },

    #[error("storage error: {0}")]
    Data(#[from] DataError),
}

impl QueryError {
    /// True for failures caused by the request itself rather than by a
    /// collaborator.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, QueryError::Data(_))
    }
}

/// Errors raised while copying a block range from an upstream node
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid sync range: {0}")]
    InvalidRange(String),

    #[error("upstream: {0}")]
    Upstream(DataError),

    #[error("storage: {0}")]
    Storage(DataError),
}

/// Errors from the filter registry
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter not found")]
    FilterNotFound(String),

    #[error("filter {id} is not a {expected} filter")]
    WrongKind { id: String, expected: &'static str },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Snowflake allocator errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("machine id {0} exceeds the 10-bit range")]
    InvalidMachineId(u16),
}
