//! # Shared Types Crate
//!
//! Domain entities shared by the log-filter engine, the RPC gateway and the
//! node binary.
//!
//! ## Contents
//!
//! - **Entities** (`entities`): `Address`, `Hash`, `Bloom`, `LogRecord`,
//!   `BlockBloomRecord`
//! - **Criteria** (`criteria`): `FilterCriteria` and `BlockNumberSpec` with
//!   their `eth_getLogs` wire forms
//! - **Encoding** (`encoding`): hex quantity, hex bytes and duration serde helpers
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate record is defined here.
//! - **Normalised identifiers**: addresses and hashes are fixed-width byte
//!   arrays, so case never matters after decoding.

pub mod criteria;
pub mod encoding;
pub mod entities;

pub use criteria::{BlockNumberSpec, CriteriaError, FilterCriteria};
pub use encoding::EncodingError;
pub use entities::*;
