//! In-memory collaborators for tests and embedding.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::collaborator::{
    CompanionDescriptor, CompanionSource, EmbeddingSource, EntityProperties, EntityPropertySource,
    GeoEntityResolver, PropertyValue, ENTITY_ID_COLUMN,
};
use crate::error::{AugmentError, Result};
use crate::input::{Column, Table};
use crate::schema::ColumnMetadata;

/// Companion tables registered by descriptor URL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompanionSource {
    tables: HashMap<String, Table>,
}

impl InMemoryCompanionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, url: impl Into<String>, table: Table) -> Self {
        self.tables.insert(url.into(), table);
        self
    }
}

impl CompanionSource for InMemoryCompanionSource {
    fn fetch_companion_table(&self, descriptor: &CompanionDescriptor) -> Result<Table> {
        self.tables
            .get(&descriptor.url)
            .cloned()
            .ok_or_else(|| AugmentError::Materialization(format!("no dataset at '{}'", descriptor.url)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Fixed entity properties.
#[derive(Debug, Clone, Default)]
pub struct StaticEntityProperties {
    entities: EntityProperties,
}

impl StaticEntityProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(
        mut self,
        entity: impl Into<String>,
        property: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(property.into(), value);
        self
    }
}

impl EntityPropertySource for StaticEntityProperties {
    fn resolve_entity_properties(
        &self,
        entity_ids: &BTreeSet<String>,
        properties: &[String],
    ) -> Result<EntityProperties> {
        Ok(entity_ids
            .iter()
            .filter_map(|id| {
                let known = self.entities.get(id)?;
                let selected: BTreeMap<String, PropertyValue> = known
                    .iter()
                    .filter(|(p, _)| properties.is_empty() || properties.contains(*p))
                    .map(|(p, v)| (p.clone(), v.clone()))
                    .collect();
                (!selected.is_empty()).then(|| (id.clone(), selected))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "static-properties"
    }
}

/// Fixed embedding vectors.
#[derive(Debug, Clone, Default)]
pub struct StaticEmbeddings {
    vectors: BTreeMap<String, Vec<f64>>,
}

impl StaticEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, entity: impl Into<String>, vector: Vec<f64>) -> Self {
        self.vectors.insert(entity.into(), vector);
        self
    }
}

impl EmbeddingSource for StaticEmbeddings {
    fn fetch_embedding_vectors(&self, entity_ids: &[String]) -> Result<Table> {
        let found: Vec<(&String, &Vec<f64>)> = entity_ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| self.vectors.get(id).map(|v| (id, v)))
            .collect();
        let width = found.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

        let mut columns = vec![Column::new(
            ColumnMetadata::entity_id(ENTITY_ID_COLUMN),
            found.iter().map(|(id, _)| id.to_string()).collect(),
        )];
        for dim in 0..width {
            let values = found
                .iter()
                .map(|(_, v)| v.get(dim).map(|x| x.to_string()).unwrap_or_default())
                .collect();
            columns.push(Column::inferred(format!("v{}", dim), values));
        }
        Table::new(columns)
    }

    fn name(&self) -> &str {
        "static-embeddings"
    }
}

/// Named points; a query resolves to the nearest one within the radius.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoResolver {
    points: Vec<GeoPoint>,
}

#[derive(Debug, Clone)]
struct GeoPoint {
    latitude: f64,
    longitude: f64,
    granularity: String,
    entity: String,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point(
        mut self,
        latitude: f64,
        longitude: f64,
        granularity: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        self.points.push(GeoPoint {
            latitude,
            longitude,
            granularity: granularity.into(),
            entity: entity.into(),
        });
        self
    }
}

impl GeoEntityResolver for StaticGeoResolver {
    fn resolve_point(
        &self,
        latitude: f64,
        longitude: f64,
        granularity: &str,
        radius_km: f64,
    ) -> Result<Option<String>> {
        let nearest = self
            .points
            .iter()
            .filter(|p| p.granularity == granularity)
            .map(|p| (haversine_km(latitude, longitude, p.latitude, p.longitude), p))
            .filter(|(d, _)| *d <= radius_km)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        Ok(nearest.map(|(_, p)| p.entity.clone()))
    }

    fn name(&self) -> &str {
        "static-geo"
    }
}

/// Great-circle distance in kilometres.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
