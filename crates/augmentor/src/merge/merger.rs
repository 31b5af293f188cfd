//! Merging companion columns onto the supplied table.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};
use crate::inference::TypeInferrer;
use crate::input::{Column, Table};
use crate::join::RowPairSet;
use crate::schema::{ColumnMetadata, Provenance};

/// What happens when a right column's name already exists on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Drop the right column; left values are authoritative.
    #[default]
    LeftWins,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::LeftWins => write!(f, "left_wins"),
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = AugmentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "left_wins" => Ok(CollisionPolicy::LeftWins),
            other => Err(AugmentError::InvalidInput(format!(
                "unsupported collision policy '{}'",
                other
            ))),
        }
    }
}

/// Options for [`AugmentMerger::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Allow-list of right column positions; `None` allows every column.
    pub column_filter: Option<Vec<usize>>,
    /// Right join-key columns, always excluded from the output.
    pub right_key_columns: Vec<usize>,
    pub collision_policy: CollisionPolicy,
}

impl MergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_filter(mut self, columns: Vec<usize>) -> Self {
        self.column_filter = Some(columns);
        self
    }

    pub fn with_right_key_columns(mut self, columns: Vec<usize>) -> Self {
        self.right_key_columns = columns;
        self
    }
}

/// The augmented table: left columns first, then contributed right columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    table: Table,
    /// Left rows that received values from a right row.
    matched_rows: usize,
}

impl MergedTable {
    pub fn new(table: Table, matched_rows: usize) -> Self {
        Self {
            table,
            matched_rows,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn matched_rows(&self) -> usize {
        self.matched_rows
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Metadata for every output column, in order.
    pub fn metadata(&self) -> Vec<&ColumnMetadata> {
        self.table.metadata()
    }

    /// Names of the columns added by augmentation.
    pub fn augmented_columns(&self) -> Vec<&str> {
        self.table
            .columns()
            .iter()
            .filter(|c| c.metadata.provenance == Provenance::Augmented)
            .map(|c| c.name())
            .collect()
    }
}

/// Builds the augmented table from two tables and their row pairs.
#[derive(Debug, Clone, Default)]
pub struct AugmentMerger {
    inferrer: TypeInferrer,
}

impl AugmentMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge right columns onto `left`.
    ///
    /// Every left row appears once, in original order. A left row with several pairs
    /// takes the lowest right index; an unpaired row gets empty cells. Fails with
    /// [`AugmentError::VacuousAugmentation`] when no right column survives selection.
    pub fn merge(
        &self,
        left: &Table,
        right: &Table,
        pairs: &RowPairSet,
        options: &MergeOptions,
    ) -> Result<MergedTable> {
        pairs.validate_bounds(left.row_count(), right.row_count())?;

        let selected = self.select_columns(left, right, options)?;
        let first = pairs.first_right_per_left();

        let mut columns: Vec<Column> = left.columns().to_vec();
        for index in selected {
            let Some(source) = right.column(index) else { continue };
            let values: Vec<String> = (0..left.row_count())
                .map(|row| {
                    first
                        .get(&row)
                        .and_then(|&r| source.get(r))
                        .unwrap_or("")
                        .to_string()
                })
                .collect();
            let mut metadata = source.metadata.as_augmented();
            metadata.logical_type = self.inferrer.infer_structural_type(&values);
            columns.push(Column::new(metadata, values));
        }

        let mut table = Table::new(columns)?;
        if let Some(id) = left.resource_id() {
            table = table.with_resource_id(id);
        }

        log::info!(
            "merged {} augmented columns; {} of {} rows matched",
            table.column_count() - left.column_count(),
            first.len(),
            left.row_count()
        );

        Ok(MergedTable::new(table, first.len()))
    }

    /// Right column positions that will be appended, in right-table order.
    fn select_columns(&self, left: &Table, right: &Table, options: &MergeOptions) -> Result<Vec<usize>> {
        let CollisionPolicy::LeftWins = options.collision_policy;

        let allowed: Option<BTreeSet<usize>> = options.column_filter.as_ref().map(|filter| {
            filter
                .iter()
                .copied()
                .filter(|&c| {
                    let in_range = c < right.column_count();
                    if !in_range {
                        log::warn!("ignoring column filter entry {}: out of range", c);
                    }
                    in_range
                })
                .collect()
        });

        let left_names: BTreeSet<&str> = left.headers().into_iter().collect();
        let mut taken: BTreeSet<&str> = BTreeSet::new();
        let mut selected = Vec::new();

        for (index, column) in right.columns().iter().enumerate() {
            if options.right_key_columns.contains(&index) {
                continue;
            }
            if allowed.as_ref().is_some_and(|a| !a.contains(&index)) {
                continue;
            }
            if left_names.contains(column.name()) {
                log::debug!("dropping right column '{}': name exists on the left", column.name());
                continue;
            }
            if !taken.insert(column.name()) {
                log::debug!("dropping duplicate right column '{}'", column.name());
                continue;
            }
            selected.push(index);
        }

        if selected.is_empty() {
            return Err(AugmentError::VacuousAugmentation(format!(
                "no columns to add from {} right columns after key exclusion, name collisions and filtering",
                right.column_count()
            )));
        }
        Ok(selected)
    }
}
