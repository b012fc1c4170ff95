//! Block range normalisation
//!
//! Turns caller bounds into the inclusive height interval the query engine
//! scans:
//!
//! 1. unset or symbolic bounds (`latest`, `pending`, ...) default to the
//!    indexed chain height `H`
//! 2. an explicit `0` (or `earliest`) becomes block `1`
//! 3. spans wider than the block span limit are rejected
//! 4. a start beyond `H` yields an empty scan
//! 5. the end is clamped to `H + overhang`

use shared_types::FilterCriteria;

use crate::error::QueryError;

/// Default tolerance between the indexed head and a requested end height.
pub const DEFAULT_OVERHANG: u64 = 600;

/// Explicit bounds taken from the criteria, before the chain height is known.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestedRange {
    from: Option<u64>,
    to: Option<u64>,
}

impl RequestedRange {
    pub fn new(from: Option<u64>, to: Option<u64>) -> Self {
        Self {
            from: from.map(|n| n.max(1)),
            to: to.map(|n| n.max(1)),
        }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(
            criteria.from_block.and_then(|b| b.explicit()),
            criteria.to_block.and_then(|b| b.explicit()),
        )
    }

    /// True when both bounds are explicit, so the span can be checked
    /// without consulting storage.
    pub fn is_explicit(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Fill unset bounds with the chain height.
    pub fn resolve(&self, height: u64) -> (u64, u64) {
        (self.from.unwrap_or(height), self.to.unwrap_or(height))
    }
}

/// Reject `to - from > limit`.
pub fn check_span(from: u64, to: u64, limit: u64) -> Result<(), QueryError> {
    if to.saturating_sub(from) > limit {
        return Err(QueryError::RangeTooLarge { limit });
    }
    Ok(())
}

/// Heights the engine will visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPlan {
    /// Nothing to read.
    Empty,
    /// Inclusive interval, ascending.
    Scan { from: u64, to: u64 },
}

/// Apply the chain-height bound and the overhang clamp.
pub fn plan_scan(from: u64, to: u64, height: u64, overhang: u64) -> ScanPlan {
    if from > height {
        return ScanPlan::Empty;
    }
    let to = to.min(height.saturating_add(overhang));
    if from > to {
        return ScanPlan::Empty;
    }
    ScanPlan::Scan { from, to }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::BlockNumberSpec;

    #[test]
    fn test_unset_bounds_default_to_height() {
        let range = RequestedRange::from_criteria(&FilterCriteria::new());
        assert!(!range.is_explicit());
        assert_eq!(range.resolve(100), (100, 100));
    }

    #[test]
    fn test_symbolic_bounds_default_to_height() {
        let criteria = FilterCriteria::new().with_range(
            Some(BlockNumberSpec::Pending),
            Some(BlockNumberSpec::Latest),
        );
        assert_eq!(RequestedRange::from_criteria(&criteria).resolve(42), (42, 42));
    }

    #[test]
    fn test_zero_and_earliest_become_block_one() {
        let criteria = FilterCriteria::new().with_range(
            Some(BlockNumberSpec::Number(0)),
            Some(BlockNumberSpec::Earliest),
        );
        let range = RequestedRange::from_criteria(&criteria);
        assert!(range.is_explicit());
        assert_eq!(range.resolve(100), (1, 1));
    }

    #[test]
    fn test_span_limit() {
        assert!(check_span(1, 10_001, 10_000).is_ok());
        assert!(matches!(
            check_span(1, 50_000, 10_000),
            Err(QueryError::RangeTooLarge { limit: 10_000 })
        ));
        assert!(check_span(10, 5, 0).is_ok(), "inverted ranges are not oversized");
    }

    #[test]
    fn test_future_range_is_empty() {
        assert_eq!(plan_scan(101, 150, 100, DEFAULT_OVERHANG), ScanPlan::Empty);
    }

    #[test]
    fn test_end_is_clamped_to_overhang() {
        assert_eq!(
            plan_scan(100, 1_100, 100, DEFAULT_OVERHANG),
            ScanPlan::Scan { from: 100, to: 700 }
        );
        assert_eq!(
            plan_scan(90, 95, 100, DEFAULT_OVERHANG),
            ScanPlan::Scan { from: 90, to: 95 }
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert_eq!(plan_scan(50, 40, 100, DEFAULT_OVERHANG), ScanPlan::Empty);
    }
}
