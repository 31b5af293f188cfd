//! Search hits from the four backends and what each needs to be joined.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::query::TemporalConstraint;
use crate::error::{AugmentError, Result};
use crate::input::{Column, Table};
use crate::join::{CandidateJoinResolver, ColumnDescriptor, CompanionView, DeclaredKeyMapping, JoinSpec};
use crate::merge::{MergeOptions, MergedTable};
use crate::provider::{Collaborators, CompanionDescriptor, ENTITY_ID_COLUMN};
use crate::schema::{ColumnMetadata, TableSide};
use crate::temporal::{temporal_score, Granularity, TimeRange};

/// Time span a companion dataset covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCoverage {
    /// Companion column holding the time values.
    pub column: String,
    pub range: TimeRange,
    pub granularity: Granularity,
}

/// A catalog dataset found by keyword/variable search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub dataset_id: String,
    #[serde(default)]
    pub title: String,
    pub companion: CompanionDescriptor,
    /// Relevance reported by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Companion column(s) the dataset was indexed under.
    #[serde(default)]
    pub right_keys: Vec<String>,
    /// Supplied column(s) the query matched.
    #[serde(default)]
    pub left_variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<TimeCoverage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_time: Option<TemporalConstraint>,
    /// Companion column name to position, shipped with the catalog record.
    #[serde(default)]
    pub column_snapshot: IndexMap<String, usize>,
    /// Companion columns the uploader marked for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_columns: Option<Vec<String>>,
}

impl KeywordHit {
    pub fn new(dataset_id: impl Into<String>, companion: CompanionDescriptor) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            title: String::new(),
            companion,
            relevance: None,
            right_keys: Vec::new(),
            left_variables: Vec::new(),
            coverage: None,
            query_time: None,
            column_snapshot: IndexMap::new(),
            display_columns: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn with_keys(
        mut self,
        right_keys: impl IntoIterator<Item = impl Into<String>>,
        left_variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.right_keys = right_keys.into_iter().map(Into::into).collect();
        self.left_variables = left_variables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_coverage(mut self, coverage: TimeCoverage) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn with_query_time(mut self, query_time: TemporalConstraint) -> Self {
        self.query_time = Some(query_time);
        self
    }

    /// Snapshot the column layout of a known companion table.
    pub fn with_snapshot_of(mut self, companion: &Table) -> Self {
        self.column_snapshot = snapshot_of(companion);
        self
    }

    pub fn with_display_columns(mut self, columns: Vec<String>) -> Self {
        self.display_columns = Some(columns);
        self
    }

    /// Temporal match score of the query window against the dataset coverage.
    pub fn temporal_bonus(&self) -> f64 {
        match (&self.query_time, &self.coverage) {
            (Some(query), Some(coverage)) => temporal_score(&query.range, &coverage.range),
            _ => 0.0,
        }
    }

    /// Relevance plus temporal bonus.
    pub fn score(&self) -> f64 {
        self.relevance.unwrap_or(0.0) + self.temporal_bonus()
    }

    pub fn mapping(&self) -> DeclaredKeyMapping {
        DeclaredKeyMapping::new(self.right_keys.clone(), self.left_variables.clone())
    }

    /// Time columns to join on, if the supplied side is at least as fine as the dataset.
    fn time_columns(&self) -> Option<(&str, &str)> {
        let (query, coverage) = self.query_time.as_ref().zip(self.coverage.as_ref())?;
        if !query.granularity.is_at_least_as_fine_as(coverage.granularity) {
            log::warn!(
                "skipping time join on '{}': {} values are coarser than the {} data of '{}'",
                query.column,
                query.granularity,
                coverage.granularity,
                self.dataset_id
            );
            return None;
        }
        Some((query.column.as_str(), coverage.column.as_str()))
    }

    fn resolve(&self, supplied: &Table, view: CompanionView<'_>) -> Result<Vec<JoinSpec>> {
        let resolver = CandidateJoinResolver::new();
        let mapping = self.mapping();
        let Some((left_time, right_time)) = self.time_columns() else {
            return resolver.resolve(supplied, view, &mapping);
        };

        if mapping.right_keys.is_empty() || mapping.left_variables.is_empty() {
            let left = ColumnDescriptor::left(supplied.require_column(left_time, TableSide::Left)?)
                .with_resource_id(supplied.resource_id().map(str::to_string));
            let right =
                ColumnDescriptor::right(view.column_index(right_time)?).with_resource_id(view.resource_id());
            return Ok(vec![JoinSpec::new(vec![vec![left]], vec![vec![right]])]);
        }
        resolver.resolve_temporal(supplied, view, &mapping, left_time, right_time)
    }
}

/// Knowledge-graph properties of entities already present in the supplied data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierHit {
    /// Supplied column holding entity ids.
    pub target_column: String,
    /// Properties to add; empty means every property the source knows.
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub score: f64,
}

impl IdentifierHit {
    pub fn new(target_column: impl Into<String>, properties: Vec<String>) -> Self {
        Self {
            target_column: target_column.into(),
            properties,
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn id(&self) -> String {
        format!("identifier:{}:{}", self.target_column, self.properties.join(","))
    }

    /// Output column name for a property.
    pub fn augmented_name(&self, property: &str) -> String {
        format!("{}_{}", self.target_column, property)
    }

    /// Companion layout: the entity id column, then one column per property.
    pub fn companion_columns(&self) -> Vec<String> {
        std::iter::once(ENTITY_ID_COLUMN.to_string())
            .chain(self.properties.iter().map(|p| self.augmented_name(p)))
            .collect()
    }

    pub fn snapshot(&self) -> IndexMap<String, usize> {
        self.companion_columns()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect()
    }

    pub fn mapping(&self) -> DeclaredKeyMapping {
        DeclaredKeyMapping::new([ENTITY_ID_COLUMN], [self.target_column.clone()])
    }

    /// Build the companion table from property lookups, one row per entity.
    pub fn download(&self, supplied: &Table, collaborators: &Collaborators) -> Result<Table> {
        let target = supplied.require_column(&self.target_column, TableSide::Left)?;
        let ids: BTreeSet<String> = supplied
            .column_values(target)
            .filter(|v| !Table::is_null_value(v))
            .map(|v| v.trim().to_string())
            .collect();

        let found = collaborators
            .properties()?
            .resolve_entity_properties(&ids, &self.properties)?;
        if found.is_empty() {
            log::warn!("no properties found for {} entities in '{}'", ids.len(), self.target_column);
        }

        let properties: Vec<String> = if self.properties.is_empty() {
            found
                .values()
                .flat_map(|props| props.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            self.properties.clone()
        };

        let mut columns = vec![Column::new(
            ColumnMetadata::entity_id(ENTITY_ID_COLUMN),
            found.keys().cloned().collect(),
        )];
        for property in &properties {
            let values = found
                .values()
                .map(|props| props.get(property).map(|v| v.to_cell()).unwrap_or_default())
                .collect();
            columns.push(Column::inferred(self.augmented_name(property), values));
        }
        Table::new(columns)
    }

    /// The supplied table with empty placeholder columns for every property.
    ///
    /// Used when the target column is missing at augmentation time. Without named
    /// properties there is nothing to hold a place for, which is a vacuous result.
    pub fn placeholder(&self, supplied: &Table) -> Result<MergedTable> {
        log::warn!(
            "column '{}' missing from supplied data; returning empty placeholder columns",
            self.target_column
        );
        let mut columns = supplied.columns().to_vec();
        for property in &self.properties {
            let name = self.augmented_name(property);
            if supplied.column_index(&name).is_some() {
                continue;
            }
            columns.push(Column::new(
                ColumnMetadata::new(name).as_augmented(),
                vec![String::new(); supplied.row_count()],
            ));
        }
        if columns.len() == supplied.column_count() {
            return Err(AugmentError::VacuousAugmentation(format!(
                "no placeholder columns for '{}': {}",
                self.target_column,
                if self.properties.is_empty() {
                    "no properties named"
                } else {
                    "every property column already exists"
                }
            )));
        }
        let mut table = Table::new(columns)?;
        if let Some(id) = supplied.resource_id() {
            table = table.with_resource_id(id);
        }
        Ok(MergedTable::new(table, 0))
    }
}

/// Embedding vectors for entities in the supplied data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub target_column: String,
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub score: f64,
}

impl VectorHit {
    pub fn new(target_column: impl Into<String>, entity_ids: Vec<String>) -> Self {
        Self {
            target_column: target_column.into(),
            entity_ids,
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn id(&self) -> String {
        format!("vector:{}", self.target_column)
    }

    pub fn mapping(&self) -> DeclaredKeyMapping {
        DeclaredKeyMapping::new([ENTITY_ID_COLUMN], [self.target_column.clone()])
    }

    /// Fetch vectors and rename components `vector_NNN_of_{target}`.
    pub fn download(&self, collaborators: &Collaborators) -> Result<Table> {
        let raw = collaborators
            .embeddings()?
            .fetch_embedding_vectors(&self.entity_ids)?;
        raw.require_column(ENTITY_ID_COLUMN, TableSide::Right)?;

        let mut component = 0;
        let columns = raw
            .columns()
            .iter()
            .map(|column| {
                if column.name() == ENTITY_ID_COLUMN {
                    return column.clone();
                }
                let mut metadata = column.metadata.clone();
                metadata.name = format!("vector_{:03}_of_{}", component, self.target_column);
                component += 1;
                Column::new(metadata, column.values.clone())
            })
            .collect();
        Table::new(columns)
    }
}

/// Entities located by coordinate columns of the supplied data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeospatialHit {
    pub latitude_column: String,
    pub longitude_column: String,
    /// Entity level to resolve points to, e.g. `city`.
    pub granularity: String,
    pub radius_km: f64,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub score: f64,
    /// Fraction of rows with usable coordinates.
    #[serde(default)]
    pub coverage_score: f64,
}

impl GeospatialHit {
    pub fn new(
        latitude_column: impl Into<String>,
        longitude_column: impl Into<String>,
        granularity: impl Into<String>,
        radius_km: f64,
    ) -> Self {
        Self {
            latitude_column: latitude_column.into(),
            longitude_column: longitude_column.into(),
            granularity: granularity.into(),
            radius_km,
            properties: Vec::new(),
            score: 1.0,
            coverage_score: 1.0,
        }
    }

    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_coverage_score(mut self, coverage_score: f64) -> Self {
        self.coverage_score = coverage_score;
        self
    }

    pub fn id(&self) -> String {
        format!(
            "geospatial:{}:{}:{}",
            self.latitude_column, self.longitude_column, self.granularity
        )
    }

    /// Name of the generated entity column.
    pub fn entity_column(&self) -> String {
        format!(
            "{}_of_{}_{}",
            self.granularity, self.latitude_column, self.longitude_column
        )
    }

    /// The identifier augmentation run over the generated entity column.
    pub fn as_identifier(&self) -> IdentifierHit {
        IdentifierHit::new(self.entity_column(), self.properties.clone()).with_score(self.score)
    }

    /// A copy of `supplied` with the resolved entity id of each row appended.
    pub fn with_entity_column(&self, supplied: &Table, collaborators: &Collaborators) -> Result<Table> {
        let geo = collaborators.geo()?;
        let lat = supplied.require_column(&self.latitude_column, TableSide::Left)?;
        let lon = supplied.require_column(&self.longitude_column, TableSide::Left)?;

        let mut resolved: HashMap<(u64, u64), Option<String>> = HashMap::new();
        let mut values = Vec::with_capacity(supplied.row_count());
        for row in 0..supplied.row_count() {
            let point = supplied
                .get(row, lat)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .zip(supplied.get(row, lon).and_then(|v| v.trim().parse::<f64>().ok()));
            let Some((latitude, longitude)) = point else {
                values.push(String::new());
                continue;
            };
            let key = (latitude.to_bits(), longitude.to_bits());
            let entity = match resolved.get(&key) {
                Some(entity) => entity.clone(),
                None => {
                    let entity = geo.resolve_point(latitude, longitude, &self.granularity, self.radius_km)?;
                    resolved.insert(key, entity.clone());
                    entity
                }
            };
            values.push(entity.unwrap_or_default());
        }

        log::debug!(
            "resolved {} distinct points to {} entities",
            resolved.len(),
            resolved.values().flatten().collect::<BTreeSet<_>>().len()
        );
        supplied.with_column(Column::new(
            ColumnMetadata::entity_id(self.entity_column()).as_augmented(),
            values,
        ))
    }
}

/// A search hit from any backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "search_type", rename_all = "snake_case")]
pub enum SearchResult {
    Keyword(KeywordHit),
    Identifier(IdentifierHit),
    Vector(VectorHit),
    Geospatial(GeospatialHit),
}

impl SearchResult {
    pub fn id(&self) -> String {
        match self {
            SearchResult::Keyword(hit) => hit.dataset_id.clone(),
            SearchResult::Identifier(hit) => hit.id(),
            SearchResult::Vector(hit) => hit.id(),
            SearchResult::Geospatial(hit) => hit.id(),
        }
    }

    /// Ranking score.
    pub fn score(&self) -> f64 {
        match self {
            SearchResult::Keyword(hit) => hit.score(),
            SearchResult::Identifier(hit) => hit.score,
            SearchResult::Vector(hit) => hit.score,
            SearchResult::Geospatial(hit) => hit.score * hit.coverage_score,
        }
    }

    pub fn search_type(&self) -> &'static str {
        match self {
            SearchResult::Keyword(_) => "keyword",
            SearchResult::Identifier(_) => "identifier",
            SearchResult::Vector(_) => "vector",
            SearchResult::Geospatial(_) => "geospatial",
        }
    }

    pub fn declared_mapping(&self) -> DeclaredKeyMapping {
        match self {
            SearchResult::Keyword(hit) => hit.mapping(),
            SearchResult::Identifier(hit) => hit.mapping(),
            SearchResult::Vector(hit) => hit.mapping(),
            SearchResult::Geospatial(hit) => hit.as_identifier().mapping(),
        }
    }

    /// The supplied table as this result joins it.
    ///
    /// Only geospatial results change it, by appending a generated entity column
    /// to a copy.
    pub fn prepare_supplied<'a>(
        &self,
        supplied: &'a Table,
        collaborators: &Collaborators,
    ) -> Result<Cow<'a, Table>> {
        match self {
            SearchResult::Geospatial(hit) => Ok(Cow::Owned(hit.with_entity_column(supplied, collaborators)?)),
            _ => Ok(Cow::Borrowed(supplied)),
        }
    }

    /// Materialize the companion table. `supplied` must be the prepared table.
    pub fn download(&self, supplied: &Table, collaborators: &Collaborators) -> Result<Table> {
        match self {
            SearchResult::Keyword(hit) => collaborators
                .companions()?
                .fetch_companion_table(&hit.companion),
            SearchResult::Identifier(hit) => hit.download(supplied, collaborators),
            SearchResult::Vector(hit) => hit.download(collaborators),
            SearchResult::Geospatial(hit) => hit.as_identifier().download(supplied, collaborators),
        }
    }

    /// Join specs against a live companion, or against the shipped column
    /// snapshot when `companion` is `None`.
    pub fn resolve_join(&self, supplied: &Table, companion: Option<&Table>) -> Result<Vec<JoinSpec>> {
        let resolver = CandidateJoinResolver::new();
        let snapshot;
        let view = match (companion, self) {
            (Some(table), _) => CompanionView::Live(table),
            (None, SearchResult::Keyword(hit)) => CompanionView::Snapshot(&hit.column_snapshot),
            (None, SearchResult::Identifier(hit)) => {
                snapshot = hit.snapshot();
                CompanionView::Snapshot(&snapshot)
            }
            (None, SearchResult::Geospatial(hit)) => {
                snapshot = hit.as_identifier().snapshot();
                CompanionView::Snapshot(&snapshot)
            }
            (None, SearchResult::Vector(_)) => {
                log::debug!("vector results have no column snapshot; nothing to resolve");
                return Ok(Vec::new());
            }
        };

        match self {
            SearchResult::Keyword(hit) => hit.resolve(supplied, view),
            _ => resolver.resolve(supplied, view, &self.declared_mapping()),
        }
    }

    /// Companion column layout known without downloading, if any.
    pub fn companion_snapshot(&self) -> Option<IndexMap<String, usize>> {
        match self {
            SearchResult::Keyword(hit) if !hit.column_snapshot.is_empty() => Some(hit.column_snapshot.clone()),
            SearchResult::Keyword(_) | SearchResult::Vector(_) => None,
            SearchResult::Identifier(hit) => Some(hit.snapshot()),
            SearchResult::Geospatial(hit) => Some(hit.as_identifier().snapshot()),
        }
    }

    /// Merge options for joining `companion` with `spec`.
    ///
    /// Right key columns are excluded; a keyword hit's display columns become
    /// the column filter.
    pub fn merge_options(&self, companion: &Table, spec: &JoinSpec) -> MergeOptions {
        let mut keys: Vec<usize> = spec
            .right_columns()
            .iter()
            .flatten()
            .map(|d| d.column)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        let options = MergeOptions::new().with_right_key_columns(keys);

        match self {
            SearchResult::Keyword(KeywordHit {
                display_columns: Some(names),
                ..
            }) => {
                let filter = names
                    .iter()
                    .filter_map(|name| {
                        let index = companion.column_index(name);
                        if index.is_none() {
                            log::warn!("display column '{}' not in companion table", name);
                        }
                        index
                    })
                    .collect();
                options.with_column_filter(filter)
            }
            _ => options,
        }
    }
}

/// Name to position map of a table's columns.
pub(crate) fn snapshot_of(table: &Table) -> IndexMap<String, usize> {
    table
        .headers()
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}
