//! Join specifications: which column groups pair across two tables.

use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};
use crate::schema::TableSide;

/// A column position on one side of a join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub side: TableSide,
    pub column: usize,
    /// Resource id when the table is one resource inside a multi-table dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ColumnDescriptor {
    pub fn left(column: usize) -> Self {
        Self {
            side: TableSide::Left,
            column,
            resource_id: None,
        }
    }

    pub fn right(column: usize) -> Self {
        Self {
            side: TableSide::Right,
            column,
            resource_id: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: Option<String>) -> Self {
        self.resource_id = resource_id;
        self
    }
}

/// A composite key: one or more columns whose values are concatenated per row.
pub type ColumnGroup = Vec<ColumnDescriptor>;

/// Ordered `(left group, right group)` pairs.
///
/// Both group lists always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    left_columns: Vec<ColumnGroup>,
    right_columns: Vec<ColumnGroup>,
}

impl JoinSpec {
    /// Build a spec, truncating the longer group list to the shorter one.
    pub fn new(mut left_columns: Vec<ColumnGroup>, mut right_columns: Vec<ColumnGroup>) -> Self {
        if left_columns.len() != right_columns.len() {
            let shorter = left_columns.len().min(right_columns.len());
            log::warn!(
                "join spec has {} left groups and {} right groups; keeping the first {}",
                left_columns.len(),
                right_columns.len(),
                shorter
            );
            left_columns.truncate(shorter);
            right_columns.truncate(shorter);
        }
        Self {
            left_columns,
            right_columns,
        }
    }

    /// Single-column key on each side.
    pub fn single(left: usize, right: usize) -> Self {
        Self::new(
            vec![vec![ColumnDescriptor::left(left)]],
            vec![vec![ColumnDescriptor::right(right)]],
        )
    }

    pub fn left_columns(&self) -> &[ColumnGroup] {
        &self.left_columns
    }

    pub fn right_columns(&self) -> &[ColumnGroup] {
        &self.right_columns
    }

    /// Number of group pairs.
    pub fn len(&self) -> usize {
        self.left_columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left_columns.is_empty()
    }

    /// Iterate group pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&ColumnGroup, &ColumnGroup)> {
        self.left_columns.iter().zip(self.right_columns.iter())
    }

    /// Column positions of each group pair, e.g. `([1, 2], [0])`.
    pub fn column_number_pairs(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        self.pairs()
            .map(|(l, r)| {
                (
                    l.iter().map(|d| d.column).collect(),
                    r.iter().map(|d| d.column).collect(),
                )
            })
            .collect()
    }

    /// A spec holding only the group pair at `index`.
    pub fn select(&self, index: usize) -> Option<JoinSpec> {
        let left = self.left_columns.get(index)?.clone();
        let right = self.right_columns.get(index)?.clone();
        Some(JoinSpec::new(vec![left], vec![right]))
    }

    pub fn to_record(&self) -> JoinSpecRecord {
        let (left_columns, right_columns) = self.column_number_pairs().into_iter().unzip();
        JoinSpecRecord {
            left_columns,
            right_columns,
        }
    }

    /// Rebuild from column numbers. Resource ids are not persisted.
    pub fn from_record(record: &JoinSpecRecord) -> Result<Self> {
        if record.left_columns.len() != record.right_columns.len() {
            return Err(AugmentError::InvalidInput(format!(
                "join record has {} left groups and {} right groups",
                record.left_columns.len(),
                record.right_columns.len()
            )));
        }
        let to_groups = |groups: &[Vec<usize>], make: fn(usize) -> ColumnDescriptor| -> Vec<ColumnGroup> {
            groups
                .iter()
                .map(|g| g.iter().copied().map(make).collect())
                .collect()
        };
        Ok(Self::new(
            to_groups(&record.left_columns, ColumnDescriptor::left),
            to_groups(&record.right_columns, ColumnDescriptor::right),
        ))
    }
}

/// Persisted form of a [`JoinSpec`]: column numbers only, no live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpecRecord {
    pub left_columns: Vec<Vec<usize>>,
    pub right_columns: Vec<Vec<usize>>,
}
