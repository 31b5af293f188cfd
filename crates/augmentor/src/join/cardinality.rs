//! Rejection of many-to-many joins.

use super::pairs::RowPairSet;
use crate::error::{AugmentError, Result};

/// Default fan-out ratio: 1/20 of the left row count.
pub const DEFAULT_CARDINALITY_RATIO: f64 = 0.05;

/// Rejects pair sets that fan out on both sides.
///
/// One-sided fan-out (1-to-n or n-to-1) passes; the join is rejected only when the
/// largest left fan-out and the largest right fan-out both exceed
/// `left_row_count * ratio`. A side with fan-out of at most one never counts as
/// fanned out, so 1-to-1 joins on small tables pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardinalityGuard {
    ratio: f64,
}

impl Default for CardinalityGuard {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_CARDINALITY_RATIO,
        }
    }
}

impl CardinalityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom ratio; it must be positive and finite.
    pub fn with_ratio(ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(AugmentError::Config(format!(
                "cardinality ratio must be positive, got {}",
                ratio
            )));
        }
        Ok(Self { ratio })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Fan-out threshold for a left table of `left_row_count` rows.
    pub fn threshold(&self, left_row_count: usize) -> f64 {
        left_row_count as f64 * self.ratio
    }

    /// Fail with [`AugmentError::Cardinality`] on an n-to-m pair set.
    pub fn check(&self, pairs: &RowPairSet, left_row_count: usize) -> Result<()> {
        let profile = pairs.profile();
        let threshold = self.threshold(left_row_count);
        let max_left = profile.max_left_fanout();
        let max_right = profile.max_right_fanout();

        let fanned_out = |fanout: usize| fanout > 1 && fanout as f64 > threshold;
        if fanned_out(max_left) && fanned_out(max_right) {
            log::warn!(
                "rejecting n-to-m join: fan-out {} (left) / {} (right) over threshold {}",
                max_left,
                max_right,
                threshold
            );
            return Err(AugmentError::Cardinality {
                max_left_fanout: max_left,
                max_right_fanout: max_right,
                threshold,
            });
        }

        log::debug!(
            "cardinality ok: fan-out {} / {} (threshold {})",
            max_left,
            max_right,
            threshold
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_sided_fanout_passes() {
        // Left row 0 pairs with 10 right rows; every other row pairs 1:1.
        let mut pairs: RowPairSet = (0..10).map(|r| (0, r)).collect();
        pairs.extend((1..100).map(|l| (l, l + 9)));
        assert!(CardinalityGuard::new().check(&pairs, 100).is_ok());
    }

    #[test]
    fn test_many_to_many_rejected() {
        // A 6x6 block: every left row pairs with every right row.
        let pairs: RowPairSet = (0..6)
            .flat_map(|l| (0..6).map(move |r| (l, r)))
            .collect();
        match CardinalityGuard::new().check(&pairs, 100) {
            Err(AugmentError::Cardinality {
                max_left_fanout,
                max_right_fanout,
                ..
            }) => {
                assert_eq!(max_left_fanout, 6);
                assert_eq!(max_right_fanout, 6);
            }
            other => panic!("expected cardinality error, got {:?}", other),
        }
    }

    #[test]
    fn test_fanout_equal_to_threshold_passes() {
        let pairs: RowPairSet = (0..5)
            .flat_map(|l| (0..5).map(move |r| (l, r)))
            .collect();
        assert!(CardinalityGuard::new().check(&pairs, 100).is_ok());
    }

    #[test]
    fn test_one_to_one_on_small_table_passes() {
        // Threshold 0.5 sits below the unit fan-out of a 1:1 join.
        let pairs: RowPairSet = (0..10).map(|i| (i, i)).collect();
        assert!(CardinalityGuard::new().check(&pairs, 10).is_ok());
    }

    #[test]
    fn test_small_table_block_rejected() {
        let pairs: RowPairSet = (0..2).flat_map(|l| (0..2).map(move |r| (l, r))).collect();
        assert!(matches!(
            CardinalityGuard::new().check(&pairs, 10),
            Err(AugmentError::Cardinality { threshold, .. }) if threshold == 0.5
        ));
    }

    #[test]
    fn test_empty_pairs_pass() {
        assert!(CardinalityGuard::new().check(&RowPairSet::new(), 0).is_ok());
    }

    #[test]
    fn test_invalid_ratio() {
        assert!(CardinalityGuard::with_ratio(0.0).is_err());
        assert!(CardinalityGuard::with_ratio(f64::NAN).is_err());
        assert_eq!(CardinalityGuard::with_ratio(0.1).unwrap().threshold(50), 5.0);
    }
}
