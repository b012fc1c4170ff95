//! # Filter Criteria
//!
//! Caller-supplied query shape for log lookups, in the JSON form used by
//! `eth_getLogs`:
//!
//! ```json
//! {
//!   "fromBlock": "0x1", "toBlock": "latest",
//!   "address": "0x...",            // or ["0x...", "0x..."]
//!   "topics": [null, "0x...", ["0x...", "0x..."]]
//! }
//! ```
//!
//! `blockHash` selects a single block and cannot be combined with
//! `fromBlock`/`toBlock`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::encoding::{format_quantity, parse_quantity};
use crate::entities::{Address, Hash};

/// Block bound as written by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockNumberSpec {
    /// The first block. Resolves like an explicit `0`.
    Earliest,
    Latest,
    Pending,
    Safe,
    Finalized,
    Number(u64),
}

impl BlockNumberSpec {
    /// The explicit height, if this bound names one.
    ///
    /// Symbolic heads (`latest`, `pending`, `safe`, `finalized`) have no
    /// explicit height and resolve against the indexed chain head.
    pub fn explicit(&self) -> Option<u64> {
        match self {
            BlockNumberSpec::Earliest => Some(0),
            BlockNumberSpec::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn as_tag(&self) -> Option<&'static str> {
        match self {
            BlockNumberSpec::Earliest => Some("earliest"),
            BlockNumberSpec::Latest => Some("latest"),
            BlockNumberSpec::Pending => Some("pending"),
            BlockNumberSpec::Safe => Some("safe"),
            BlockNumberSpec::Finalized => Some("finalized"),
            BlockNumberSpec::Number(_) => None,
        }
    }
}

impl fmt::Display for BlockNumberSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockNumberSpec::Number(n) => write!(f, "{}", format_quantity(*n)),
            tag => write!(f, "{}", tag.as_tag().unwrap_or_default()),
        }
    }
}

impl From<u64> for BlockNumberSpec {
    fn from(n: u64) -> Self {
        BlockNumberSpec::Number(n)
    }
}

impl Serialize for BlockNumberSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockNumberSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(BlockNumberSpec::Number(n)),
            Repr::Text(s) => match s.as_str() {
                "earliest" => Ok(BlockNumberSpec::Earliest),
                "latest" => Ok(BlockNumberSpec::Latest),
                "pending" => Ok(BlockNumberSpec::Pending),
                "safe" => Ok(BlockNumberSpec::Safe),
                "finalized" => Ok(BlockNumberSpec::Finalized),
                other => parse_quantity(other)
                    .map(BlockNumberSpec::Number)
                    .map_err(|e| serde::de::Error::custom(format!("block number {other}: {e}"))),
            },
        }
    }
}

/// Rejected criteria shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("cannot specify both BlockHash and FromBlock/ToBlock, choose one or the other")]
    HashWithRange,
}

/// Address and topic constraints plus an optional block selection.
///
/// Topic position `i` constrains `log.topics[i]` only. An empty set at a
/// position is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireCriteria", into = "WireCriteria")]
pub struct FilterCriteria {
    pub block_hash: Option<Hash>,
    pub from_block: Option<BlockNumberSpec>,
    pub to_block: Option<BlockNumberSpec>,
    pub addresses: Vec<Address>,
    pub topics: Vec<Vec<Hash>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no address, topic or block hash constraint was given.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.topics.is_empty() && self.block_hash.is_none()
    }

    pub fn with_block_hash(mut self, hash: Hash) -> Self {
        self.block_hash = Some(hash);
        self
    }

    pub fn with_range(
        mut self,
        from: Option<BlockNumberSpec>,
        to: Option<BlockNumberSpec>,
    ) -> Self {
        self.from_block = from;
        self.to_block = to;
        self
    }

    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    pub fn with_topics(mut self, topics: Vec<Vec<Hash>>) -> Self {
        self.topics = topics;
        self
    }
}

/// One value or a list of values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_block: Option<BlockNumberSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_block: Option<BlockNumberSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<OneOrMany<Address>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topics: Option<Vec<Option<OneOrMany<Hash>>>>,
}

impl TryFrom<WireCriteria> for FilterCriteria {
    type Error = CriteriaError;

    fn try_from(wire: WireCriteria) -> Result<Self, Self::Error> {
        if wire.block_hash.is_some() && (wire.from_block.is_some() || wire.to_block.is_some()) {
            return Err(CriteriaError::HashWithRange);
        }

        Ok(Self {
            block_hash: wire.block_hash,
            from_block: wire.from_block,
            to_block: wire.to_block,
            addresses: wire.address.map(OneOrMany::into_vec).unwrap_or_default(),
            topics: wire
                .topics
                .unwrap_or_default()
                .into_iter()
                .map(|position| position.map(OneOrMany::into_vec).unwrap_or_default())
                .collect(),
        })
    }
}

impl From<FilterCriteria> for WireCriteria {
    fn from(criteria: FilterCriteria) -> Self {
        Self {
            block_hash: criteria.block_hash,
            from_block: criteria.from_block,
            to_block: criteria.to_block,
            address: (!criteria.addresses.is_empty()).then(|| OneOrMany::Many(criteria.addresses)),
            topics: (!criteria.topics.is_empty()).then(|| {
                criteria
                    .topics
                    .into_iter()
                    .map(|position| (!position.is_empty()).then(|| OneOrMany::Many(position)))
                    .collect()
            }),
        }
    }
}
