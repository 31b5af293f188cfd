//! Row pairing by overlapping time periods.

use chrono::{DateTime, Utc};

use super::granularity::Granularity;
use super::parse::parse_time_column;
use super::range::TimeRange;
use crate::error::{AugmentError, Result};
use crate::input::Table;
use crate::join::RowPairSet;

/// Pairs rows of two time columns whose value periods overlap.
///
/// Each value is widened to the closed period it denotes at its column's granularity
/// (`2020-06` at month granularity covers all of June), so columns of different
/// granularities align without reformatting either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalAligner;

impl TemporalAligner {
    pub fn new() -> Self {
        Self
    }

    /// Pair rows whose time periods overlap.
    ///
    /// Missing granularities are detected from the column's values. Null cells never
    /// pair. A non-null cell that does not parse yields [`AugmentError::Temporal`].
    pub fn align(
        &self,
        left_values: &[String],
        right_values: &[String],
        left_granularity: Option<Granularity>,
        right_granularity: Option<Granularity>,
    ) -> Result<RowPairSet> {
        let left = periods(left_values, left_granularity)?;
        let right = periods(right_values, right_granularity)?;

        let mut right_sorted: Vec<(usize, TimeRange)> = right
            .into_iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
            .collect();
        right_sorted.sort_by_key(|&(i, p)| (p.start, i));

        let mut pairs = RowPairSet::new();
        for (l, period) in left.into_iter().enumerate() {
            let Some(period) = period else { continue };
            // Right periods starting after this one ends cannot overlap.
            let upper = right_sorted.partition_point(|(_, p)| p.start <= period.end);
            pairs.extend(
                right_sorted[..upper]
                    .iter()
                    .filter(|(_, p)| p.end >= period.start)
                    .map(|&(r, _)| (l, r)),
            );
        }

        log::debug!("temporal alignment produced {} pairs", pairs.len());
        Ok(pairs)
    }

    /// Align two table columns using their declared granularities.
    pub fn align_columns(
        &self,
        left: &Table,
        left_column: usize,
        right: &Table,
        right_column: usize,
    ) -> Result<RowPairSet> {
        let (Some(l), Some(r)) = (left.column(left_column), right.column(right_column)) else {
            return Err(AugmentError::InvalidInput(format!(
                "time column index out of range ({}, {})",
                left_column, right_column
            )));
        };
        self.align(
            &l.values,
            &r.values,
            l.metadata.time_granularity,
            r.metadata.time_granularity,
        )
    }

    /// Keep key-matched pairs whose rows also align in time.
    pub fn combine_with_key_pairs(
        &self,
        key_pairs: &RowPairSet,
        temporal_pairs: &RowPairSet,
    ) -> RowPairSet {
        key_pairs.intersection(temporal_pairs)
    }
}

fn periods(values: &[String], granularity: Option<Granularity>) -> Result<Vec<Option<TimeRange>>> {
    let parsed = parse_time_column(values)?;
    let granularity = match granularity {
        Some(g) => g,
        None => {
            let present: Vec<DateTime<Utc>> = parsed.iter().flatten().copied().collect();
            Granularity::detect(&present).unwrap_or(Granularity::Second)
        }
    };
    Ok(parsed
        .into_iter()
        .map(|v| v.map(|v| TimeRange::period(v, granularity)))
        .collect())
}
