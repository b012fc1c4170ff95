//! Bloom indicators for addresses and topics
//!
//! Every value maps to three (byte index, bit mask) pairs inside a 256-byte
//! block bloom, derived from the first six bytes of its keccak-256 digest:
//!
//! ```text
//! mask[i]  = 1 << (h[2i+1] & 0x7)
//! index[i] = 255 - ((be_u16(h[2i..2i+2]) & 0x7ff) >> 3)
//! ```

use sha3::{Digest, Keccak256};
use shared_types::{Address, Bloom, FilterCriteria, Hash, LogRecord, BLOOM_BYTE_LENGTH};

/// The three bloom positions of one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BloomIndicator {
    indexes: [usize; 3],
    masks: [u8; 3],
}

impl BloomIndicator {
    /// Compute the indicator of an arbitrary byte string.
    pub fn new(value: &[u8]) -> Self {
        let digest = Keccak256::digest(value);
        let h = &digest[..6];

        let mut indexes = [0usize; 3];
        let mut masks = [0u8; 3];
        for i in 0..3 {
            masks[i] = 1u8 << (h[2 * i + 1] & 0x7);
            let word = u16::from_be_bytes([h[2 * i], h[2 * i + 1]]);
            indexes[i] = BLOOM_BYTE_LENGTH - 1 - usize::from((word & 0x7ff) >> 3);
        }

        Self { indexes, masks }
    }

    pub fn for_address(address: &Address) -> Self {
        Self::new(address.as_bytes())
    }

    pub fn for_topic(topic: &Hash) -> Self {
        Self::new(topic.as_bytes())
    }

    pub fn indexes(&self) -> [usize; 3] {
        self.indexes
    }

    pub fn masks(&self) -> [u8; 3] {
        self.masks
    }

    /// Set this value's bits in `bloom`.
    pub fn accrue(&self, bloom: &mut Bloom) {
        for (index, mask) in self.indexes.iter().zip(self.masks.iter()) {
            bloom.set_bits(*index, *mask);
        }
    }

    /// True if the value may be present in `bloom`.
    pub fn may_be_in(&self, bloom: &Bloom) -> bool {
        self.indexes
            .iter()
            .zip(self.masks.iter())
            .all(|(index, mask)| bloom.byte(*index) & mask != 0)
    }
}

/// Build the bloom of a block from its logs.
pub fn bloom_for_logs<'a>(logs: impl IntoIterator<Item = &'a LogRecord>) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        BloomIndicator::for_address(&log.address).accrue(&mut bloom);
        for topic in &log.topics {
            BloomIndicator::for_topic(topic).accrue(&mut bloom);
        }
    }
    bloom
}

/// Candidacy test for one set of criteria, computed once per request.
///
/// Groups are the address set (when non-empty) followed by every non-empty
/// topic position. A bloom is a candidate when each group has at least one
/// member that may be present.
#[derive(Clone, Debug, Default)]
pub struct CandidacyFilter {
    groups: Vec<Vec<BloomIndicator>>,
}

impl CandidacyFilter {
    pub fn new(addresses: &[Address], topics: &[Vec<Hash>]) -> Self {
        let mut groups = Vec::with_capacity(1 + topics.len());
        if !addresses.is_empty() {
            groups.push(addresses.iter().map(BloomIndicator::for_address).collect());
        }
        for position in topics.iter().filter(|p| !p.is_empty()) {
            groups.push(position.iter().map(BloomIndicator::for_topic).collect());
        }
        Self { groups }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(&criteria.addresses, &criteria.topics)
    }

    /// True when every bloom is a candidate.
    pub fn is_unconstrained(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, bloom: &Bloom) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|indicator| indicator.may_be_in(bloom)))
    }
}
