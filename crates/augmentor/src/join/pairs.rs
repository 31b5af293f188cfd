//! Row correspondences between two tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};

/// Set of `(left_row, right_row)` index pairs, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPairSet {
    pairs: BTreeSet<(usize, usize)>,
}

impl RowPairSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair; duplicates are ignored.
    pub fn insert(&mut self, left: usize, right: usize) -> bool {
        self.pairs.insert((left, right))
    }

    pub fn contains(&self, left: usize, right: usize) -> bool {
        self.pairs.contains(&(left, right))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in ascending `(left, right)` order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().copied()
    }

    /// Pairs kept by both sets.
    pub fn intersection(&self, other: &RowPairSet) -> RowPairSet {
        self.pairs.intersection(&other.pairs).copied().collect()
    }

    /// Distinct left indices that have at least one pair.
    pub fn left_indices(&self) -> BTreeSet<usize> {
        self.pairs.iter().map(|&(l, _)| l).collect()
    }

    /// First right index paired with each left index (lowest right index wins).
    pub fn first_right_per_left(&self) -> BTreeMap<usize, usize> {
        let mut first = BTreeMap::new();
        for &(l, r) in &self.pairs {
            first.entry(l).or_insert(r);
        }
        first
    }

    /// Check every pair references a row inside the given tables.
    pub fn validate_bounds(&self, left_rows: usize, right_rows: usize) -> Result<()> {
        match self.pairs.iter().find(|&&(l, r)| l >= left_rows || r >= right_rows) {
            Some(&(l, r)) => Err(AugmentError::InvalidInput(format!(
                "row pair ({}, {}) out of range for tables of {} and {} rows",
                l, r, left_rows, right_rows
            ))),
            None => Ok(()),
        }
    }

    /// Fan-out profile of this pair set.
    pub fn profile(&self) -> CardinalityProfile {
        CardinalityProfile::from_pairs(self)
    }
}

impl FromIterator<(usize, usize)> for RowPairSet {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl Extend<(usize, usize)> for RowPairSet {
    fn extend<I: IntoIterator<Item = (usize, usize)>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}

/// Per-index fan-out counts derived from a [`RowPairSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalityProfile {
    /// Distinct right rows paired with each left row.
    pub left_fanout: BTreeMap<usize, usize>,
    /// Distinct left rows paired with each right row.
    pub right_fanout: BTreeMap<usize, usize>,
}

impl CardinalityProfile {
    pub fn from_pairs(pairs: &RowPairSet) -> Self {
        let mut profile = Self::default();
        for (l, r) in pairs.iter() {
            *profile.left_fanout.entry(l).or_insert(0) += 1;
            *profile.right_fanout.entry(r).or_insert(0) += 1;
        }
        profile
    }

    pub fn max_left_fanout(&self) -> usize {
        self.left_fanout.values().copied().max().unwrap_or(0)
    }

    pub fn max_right_fanout(&self) -> usize {
        self.right_fanout.values().copied().max().unwrap_or(0)
    }

    /// Short label: "1-to-1", "1-to-n", "n-to-1", "n-to-m" or "empty".
    pub fn shape(&self) -> &'static str {
        match (self.max_left_fanout(), self.max_right_fanout()) {
            (0, _) | (_, 0) => "empty",
            (1, 1) => "1-to-1",
            (_, 1) => "1-to-n",
            (1, _) => "n-to-1",
            _ => "n-to-m",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_is_sorted() {
        let pairs: RowPairSet = vec![(2, 0), (0, 1), (0, 0), (1, 2)].into_iter().collect();
        assert_eq!(pairs.iter().collect::<Vec<_>>(), vec![(0, 0), (0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn test_profile_counts_distinct_partners() {
        let pairs: RowPairSet = vec![(0, 0), (0, 1), (0, 1), (1, 1)].into_iter().collect();
        let profile = pairs.profile();
        assert_eq!(profile.left_fanout[&0], 2);
        assert_eq!(profile.right_fanout[&1], 2);
        assert_eq!(profile.max_left_fanout(), 2);
        assert_eq!(profile.shape(), "n-to-m");
    }

    #[test]
    fn test_first_right_per_left() {
        let pairs: RowPairSet = vec![(0, 5), (0, 2), (3, 1)].into_iter().collect();
        let first = pairs.first_right_per_left();
        assert_eq!(first[&0], 2);
        assert_eq!(first[&3], 1);
    }

    #[test]
    fn test_validate_bounds() {
        let pairs: RowPairSet = vec![(0, 0), (1, 3)].into_iter().collect();
        assert!(pairs.validate_bounds(2, 4).is_ok());
        assert!(pairs.validate_bounds(2, 3).is_err());
    }

    #[test]
    fn test_shapes() {
        let one_to_n: RowPairSet = vec![(0, 0), (0, 1)].into_iter().collect();
        assert_eq!(one_to_n.profile().shape(), "1-to-n");
        let n_to_one: RowPairSet = vec![(0, 0), (1, 0)].into_iter().collect();
        assert_eq!(n_to_one.profile().shape(), "n-to-1");
        assert_eq!(RowPairSet::new().profile().shape(), "empty");
    }
}
