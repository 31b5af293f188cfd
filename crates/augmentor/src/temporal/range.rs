//! Closed time ranges and the temporal match score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::granularity::Granularity;
use super::parse::parse_timestamp;
use crate::error::{AugmentError, Result};

/// A closed interval `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range; `start` must not be after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AugmentError::InvalidInput(format!(
                "time range starts after it ends ({} > {})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    /// The full period containing `value` at `granularity`.
    pub fn period(value: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            start: granularity.truncate(value),
            end: granularity.period_end(value),
        }
    }

    /// Smallest range covering every value, or `None` if there are none.
    pub fn covering(values: impl IntoIterator<Item = DateTime<Utc>>) -> Option<Self> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (start, end) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { start, end })
    }

    /// Closed-interval overlap test.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// The shared part of two ranges.
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

/// Ranking score for how well a dataset's time coverage serves a query range.
///
/// Disjoint ranges score 0.0. When either range contains the other the score is 1.0.
/// Partial overlaps score the fraction of the query range covered by the dataset.
pub fn temporal_score(query: &TimeRange, dataset: &TimeRange) -> f64 {
    let Some(shared) = query.intersection(dataset) else {
        return 0.0;
    };
    if dataset.contains(query) || query.contains(dataset) {
        return 1.0;
    }
    let query_secs = query.duration_secs();
    if query_secs <= 0 {
        return 1.0;
    }
    (shared.duration_secs() as f64 / query_secs as f64).clamp(0.0, 1.0)
}
