//! Collaborator traits and types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};
use crate::input::Table;

/// Name of the identifier column in property and embedding companions.
pub const ENTITY_ID_COLUMN: &str = "entity_id";

/// Where and how to fetch a companion dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanionDescriptor {
    /// URL or local path of the raw file.
    pub url: String,
    /// Declared file format (`csv`, `tsv`, ...); empty means detect.
    #[serde(default)]
    pub file_format: String,
    /// Extra metadata shipped with the dataset record.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl CompanionDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.file_format = format.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Delimiter implied by the declared format, if any.
    pub fn delimiter(&self) -> Option<u8> {
        match self.file_format.to_ascii_lowercase().as_str() {
            "csv" | "text/csv" => Some(b','),
            "tsv" | "text/tab-separated-values" => Some(b'\t'),
            _ => None,
        }
    }
}

/// A knowledge-graph property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Quantity(f64),
    Time(DateTime<Utc>),
}

impl PropertyValue {
    /// Cell text for a companion table.
    pub fn to_cell(&self) -> String {
        match self {
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Quantity(q) => q.to_string(),
            PropertyValue::Time(t) => t.to_rfc3339(),
        }
    }
}

/// Property values per entity, keyed by entity id then property name.
pub type EntityProperties = BTreeMap<String, BTreeMap<String, PropertyValue>>;

/// Materializes companion datasets.
///
/// Implementations must be thread-safe (Send + Sync) so one source can serve
/// several augmentations.
pub trait CompanionSource: Send + Sync {
    /// Fetch the raw table behind `descriptor`.
    ///
    /// Failures surface as [`AugmentError::Materialization`].
    fn fetch_companion_table(&self, descriptor: &CompanionDescriptor) -> Result<Table>;

    /// Name of this source (for logging/debugging).
    fn name(&self) -> &str;
}

/// Knowledge-graph property lookup for identifier-keyed augmentation.
pub trait EntityPropertySource: Send + Sync {
    /// Look up `properties` for each entity.
    ///
    /// An empty `properties` slice asks for every known property. Entities
    /// without data are absent from the result.
    fn resolve_entity_properties(
        &self,
        entity_ids: &BTreeSet<String>,
        properties: &[String],
    ) -> Result<EntityProperties>;

    fn name(&self) -> &str;
}

/// Precomputed embedding store.
pub trait EmbeddingSource: Send + Sync {
    /// One row per known identifier: an [`ENTITY_ID_COLUMN`] column followed by
    /// fixed-width numeric vector columns.
    fn fetch_embedding_vectors(&self, entity_ids: &[String]) -> Result<Table>;

    fn name(&self) -> &str;
}

/// Maps a coordinate to the entity covering it.
pub trait GeoEntityResolver: Send + Sync {
    /// Entity id at `granularity` (e.g. `city`) within `radius_km` of the point.
    fn resolve_point(
        &self,
        latitude: f64,
        longitude: f64,
        granularity: &str,
        radius_km: f64,
    ) -> Result<Option<String>>;

    fn name(&self) -> &str;
}

/// Opaque content cache.
///
/// The caller computes keys; implementations only store and return bytes.
pub trait ResultCache: Send + Sync {
    fn cache_get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value; returns whether it was stored.
    fn cache_put(&self, key: &str, value: &[u8]) -> Result<bool>;
}

/// The collaborators available to one augmentation.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub companions: Option<Arc<dyn CompanionSource>>,
    pub properties: Option<Arc<dyn EntityPropertySource>>,
    pub embeddings: Option<Arc<dyn EmbeddingSource>>,
    pub geo: Option<Arc<dyn GeoEntityResolver>>,
    pub cache: Option<Arc<dyn ResultCache>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn companions(&self) -> Result<&dyn CompanionSource> {
        self.companions.as_deref().ok_or_else(|| missing("companion source"))
    }

    pub fn properties(&self) -> Result<&dyn EntityPropertySource> {
        self.properties.as_deref().ok_or_else(|| missing("entity property source"))
    }

    pub fn embeddings(&self) -> Result<&dyn EmbeddingSource> {
        self.embeddings.as_deref().ok_or_else(|| missing("embedding source"))
    }

    pub fn geo(&self) -> Result<&dyn GeoEntityResolver> {
        self.geo.as_deref().ok_or_else(|| missing("geospatial resolver"))
    }

    pub fn cache(&self) -> Option<&dyn ResultCache> {
        self.cache.as_deref()
    }
}

fn missing(what: &str) -> AugmentError {
    AugmentError::Config(format!("no {} configured", what))
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("companions", &self.companions.as_ref().map(|c| c.name().to_string()))
            .field("properties", &self.properties.as_ref().map(|p| p.name().to_string()))
            .field("embeddings", &self.embeddings.as_ref().map(|e| e.name().to_string()))
            .field("geo", &self.geo.as_ref().map(|g| g.name().to_string()))
            .field("cache", &self.cache.is_some())
            .finish()
    }
}
