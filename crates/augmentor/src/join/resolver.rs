//! Resolution of declared key columns into join specifications.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::spec::{ColumnDescriptor, ColumnGroup, JoinSpec};
use crate::error::{AugmentError, Result};
use crate::input::Table;
use crate::schema::TableSide;

/// Key columns named by search metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredKeyMapping {
    /// Companion column(s) the dataset was indexed under.
    pub right_keys: Vec<String>,
    /// Supplied-data column(s) the query matched against.
    pub left_variables: Vec<String>,
}

impl DeclaredKeyMapping {
    pub fn new(
        right_keys: impl IntoIterator<Item = impl Into<String>>,
        left_variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            right_keys: right_keys.into_iter().map(Into::into).collect(),
            left_variables: left_variables.into_iter().map(Into::into).collect(),
        }
    }
}

/// What is known about the companion table at resolution time.
#[derive(Debug, Clone, Copy)]
pub enum CompanionView<'a> {
    /// The materialized table.
    Live(&'a Table),
    /// A column name to position snapshot shipped with the search result.
    Snapshot(&'a IndexMap<String, usize>),
}

impl CompanionView<'_> {
    /// Position of a companion column by name.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        let found = match self {
            CompanionView::Live(table) => table.column_index(name),
            CompanionView::Snapshot(snapshot) => snapshot.get(name).copied(),
        };
        found.ok_or_else(|| AugmentError::ColumnNotFound {
            column: name.to_string(),
            side: TableSide::Right,
        })
    }

    pub fn resource_id(&self) -> Option<String> {
        match self {
            CompanionView::Live(table) => table.resource_id().map(str::to_string),
            CompanionView::Snapshot(_) => None,
        }
    }
}

/// Turns declared key names into positional [`JoinSpec`]s.
///
/// Live and snapshot views produce the same structure: one spec whose group pairs
/// match each left variable against a right key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateJoinResolver;

impl CandidateJoinResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the declared mapping against the supplied table and companion view.
    ///
    /// Returns an empty list when the mapping names nothing to join on. A single
    /// right key pairs with every left variable; otherwise keys and variables pair
    /// positionally, and surplus entries on either side are dropped with a warning.
    pub fn resolve(
        &self,
        supplied: &Table,
        companion: CompanionView<'_>,
        mapping: &DeclaredKeyMapping,
    ) -> Result<Vec<JoinSpec>> {
        if mapping.right_keys.is_empty() || mapping.left_variables.is_empty() {
            log::debug!("no declared key columns; nothing to resolve");
            return Ok(Vec::new());
        }

        let left_resource = supplied.resource_id().map(str::to_string);
        let right_resource = companion.resource_id();

        let left_groups: Vec<ColumnGroup> = mapping
            .left_variables
            .iter()
            .map(|name| {
                supplied.require_column(name, TableSide::Left).map(|i| {
                    vec![ColumnDescriptor::left(i).with_resource_id(left_resource.clone())]
                })
            })
            .collect::<Result<_>>()?;

        let right_columns: Vec<usize> = mapping
            .right_keys
            .iter()
            .map(|name| companion.column_index(name))
            .collect::<Result<_>>()?;

        let right_group = |i: usize| vec![ColumnDescriptor::right(i).with_resource_id(right_resource.clone())];
        let right_groups: Vec<ColumnGroup> = match right_columns.as_slice() {
            [only] => left_groups.iter().map(|_| right_group(*only)).collect(),
            many => many.iter().copied().map(right_group).collect(),
        };

        Ok(vec![JoinSpec::new(left_groups, right_groups)])
    }

    /// Resolve with a time column prepended to every group on both sides.
    pub fn resolve_temporal(
        &self,
        supplied: &Table,
        companion: CompanionView<'_>,
        mapping: &DeclaredKeyMapping,
        left_time: &str,
        right_time: &str,
    ) -> Result<Vec<JoinSpec>> {
        let specs = self.resolve(supplied, companion, mapping)?;
        let lt = ColumnDescriptor::left(supplied.require_column(left_time, TableSide::Left)?)
            .with_resource_id(supplied.resource_id().map(str::to_string));
        let rt = ColumnDescriptor::right(companion.column_index(right_time)?)
            .with_resource_id(companion.resource_id());

        let prepend = |time: &ColumnDescriptor, groups: &[ColumnGroup]| -> Vec<ColumnGroup> {
            groups
                .iter()
                .map(|g| std::iter::once(time.clone()).chain(g.iter().cloned()).collect())
                .collect()
        };

        Ok(specs
            .iter()
            .map(|spec| {
                JoinSpec::new(
                    prepend(&lt, spec.left_columns()),
                    prepend(&rt, spec.right_columns()),
                )
            })
            .collect())
    }
}
