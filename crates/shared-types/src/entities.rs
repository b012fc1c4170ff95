//! # Core Domain Entities
//!
//! The records the indexer reads and writes:
//!
//! - `LogRecord`: one decoded event log, immutable once ingested
//! - `BlockBloomRecord`: the 2048-bit bloom indicator of one indexed block
//! - `Bloom`: the 256-byte indicator itself

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::encoding::{bytes_hex, decode_hex_bytes, quantity, EncodingError};

// Re-export fixed-width identifiers from primitive-types.
pub use primitive_types::{H160, H256};

/// A 20-byte contract address.
///
/// Hex decoding accepts either case and encoding always emits lower case,
/// so comparing two `Address` values is a case-insensitive comparison of
/// their textual forms.
pub type Address = H160;

/// A 32-byte hash (block hash, transaction hash or log topic).
pub type Hash = H256;

// =============================================================================
// BLOOM
// =============================================================================

/// Size of a block bloom in bytes.
pub const BLOOM_BYTE_LENGTH: usize = 256;

/// Size of a block bloom in bits.
pub const BLOOM_BIT_LENGTH: usize = BLOOM_BYTE_LENGTH * 8;

/// A 2048-bit block bloom.
///
/// Superset indicator over every address and topic of the logs contained in
/// a block: it may report false positives, never false negatives.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bloom([u8; BLOOM_BYTE_LENGTH]);

impl Bloom {
    /// The empty bloom.
    pub const fn zero() -> Self {
        Self([0u8; BLOOM_BYTE_LENGTH])
    }

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; BLOOM_BYTE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 256 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let array: [u8; BLOOM_BYTE_LENGTH] =
            bytes.try_into().map_err(|_| EncodingError::InvalidLength {
                expected: BLOOM_BYTE_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; BLOOM_BYTE_LENGTH] {
        &self.0
    }

    /// Byte at `index`; indices past the end read as zero.
    pub fn byte(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// OR `mask` into the byte at `index`. Out-of-range indices are ignored.
    pub fn set_bits(&mut self, index: usize, mask: u8) {
        if let Some(byte) = self.0.get_mut(index) {
            *byte |= mask;
        }
    }

    /// OR another bloom into this one.
    pub fn accrue_bloom(&mut self, other: &Bloom) {
        for (dst, src) in self.0.iter_mut().zip(other.0.iter()) {
            *dst |= *src;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom({} bits set)", self.count_ones())
    }
}

impl FromStr for Bloom {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&decode_hex_bytes(s)?)
    }
}

impl Serialize for Bloom {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bloom {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// One event log as stored by the ingestion side and returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics, position-significant.
    #[serde(default)]
    pub topics: Vec<Hash>,
    /// Non-indexed payload.
    #[serde(with = "bytes_hex", default)]
    pub data: Vec<u8>,
    #[serde(with = "quantity")]
    pub block_number: u64,
    pub transaction_hash: Hash,
    #[serde(with = "quantity")]
    pub transaction_index: u64,
    pub block_hash: Hash,
    #[serde(with = "quantity")]
    pub log_index: u64,
    /// Set when the log was reverted by a chain reorganisation.
    #[serde(default)]
    pub removed: bool,
}

/// Bloom index entry for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBloomRecord {
    #[serde(with = "quantity")]
    pub block_number: u64,
    pub block_hash: Hash,
    pub bloom: Bloom,
}
