//! Finding identifier, vector and geospatial candidates in the supplied data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::query::sample;
use super::result::{GeospatialHit, IdentifierHit, SearchResult, VectorHit};
use crate::error::Result;
use crate::input::Table;
use crate::provider::EntityPropertySource;
use crate::schema::SemanticTag;

/// Discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Most entities sent to the property source per column.
    pub max_entity_query_size: usize,
    /// Fraction of sampled entities a property must cover to be offered.
    pub property_threshold: f64,
    /// Minimum distinct-to-present ratio for a vector candidate column.
    pub min_unique_entity_ratio: f64,
    /// Entity level geospatial points resolve to.
    pub geo_granularity: String,
    pub geo_radius_km: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_entity_query_size: 500,
            property_threshold: 0.5,
            min_unique_entity_ratio: 0.1,
            geo_granularity: "city".to_string(),
            geo_radius_km: 10.0,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_max_entity_query_size(mut self, size: usize) -> Self {
        self.max_entity_query_size = size;
        self
    }

    pub fn with_property_threshold(mut self, threshold: f64) -> Self {
        self.property_threshold = threshold;
        self
    }
}

/// Distinct non-null values of a column, sorted.
fn distinct_values(table: &Table, column: usize) -> BTreeSet<String> {
    table
        .column_values(column)
        .filter(|v| !Table::is_null_value(v))
        .map(|v| v.trim().to_string())
        .collect()
}

fn entity_columns(table: &Table) -> impl Iterator<Item = usize> + '_ {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.metadata.is_entity_id())
        .map(|(i, _)| i)
}

/// Offer property augmentation for every entity-id column.
///
/// Ids are sampled down to `max_entity_query_size` with `rng`. A property is
/// offered when at least `property_threshold` of sampled entities have it; the
/// hit's score is the mean coverage of the offered properties.
pub fn discover_identifier_results(
    supplied: &Table,
    source: &dyn EntityPropertySource,
    config: &DiscoveryConfig,
    rng: &mut fastrand::Rng,
) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();

    for column in entity_columns(supplied) {
        let ids: Vec<String> = distinct_values(supplied, column).into_iter().collect();
        if ids.is_empty() {
            continue;
        }
        let sampled: BTreeSet<String> = sample(ids, config.max_entity_query_size, rng)
            .into_iter()
            .collect();

        let found = source.resolve_entity_properties(&sampled, &[])?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for properties in found.values() {
            for name in properties.keys() {
                *counts.entry(name.as_str()).or_default() += 1;
            }
        }

        let total = sampled.len() as f64;
        let kept: Vec<(&str, f64)> = counts
            .into_iter()
            .map(|(name, n)| (name, n as f64 / total))
            .filter(|(_, coverage)| *coverage >= config.property_threshold)
            .collect();
        if kept.is_empty() {
            log::debug!("no property reaches the threshold for column {}", column);
            continue;
        }

        let score = kept.iter().map(|(_, c)| c).sum::<f64>() / kept.len() as f64;
        let name = supplied.column(column).map(|c| c.name()).unwrap_or_default();
        log::info!("identifier candidate '{}' with {} properties", name, kept.len());
        results.push(SearchResult::Identifier(
            IdentifierHit::new(name, kept.into_iter().map(|(p, _)| p.to_string()).collect())
                .with_score(score),
        ));
    }

    Ok(results)
}

/// Offer embedding augmentation for entity-id columns that are distinct enough.
pub fn discover_vector_results(supplied: &Table, config: &DiscoveryConfig) -> Vec<SearchResult> {
    entity_columns(supplied)
        .filter_map(|column| {
            let present = supplied
                .column_values(column)
                .filter(|v| !Table::is_null_value(v))
                .count();
            let ids = distinct_values(supplied, column);
            if present == 0 {
                return None;
            }
            let ratio = ids.len() as f64 / present as f64;
            if ratio < config.min_unique_entity_ratio {
                log::debug!("column {} too repetitive for vectors ({:.3})", column, ratio);
                return None;
            }
            let name = supplied.column(column)?.name();
            Some(SearchResult::Vector(
                VectorHit::new(name, ids.into_iter().collect()).with_score(ratio),
            ))
        })
        .collect()
}

/// Pair latitude and longitude columns into geospatial candidates.
///
/// Location-tagged columns named `lat*` are latitudes, the rest longitudes.
/// Pairs are formed in column order; the coverage score is the fraction of rows
/// where both coordinates parse and lie in range.
pub fn discover_geospatial_results(supplied: &Table, config: &DiscoveryConfig) -> Vec<SearchResult> {
    let (latitudes, longitudes): (Vec<usize>, Vec<usize>) = supplied
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.metadata.has_tag(SemanticTag::Location))
        .map(|(i, _)| i)
        .partition(|&i| {
            supplied
                .column(i)
                .is_some_and(|c| c.name().trim().to_ascii_lowercase().starts_with("lat"))
        });

    latitudes
        .into_iter()
        .zip(longitudes)
        .filter_map(|(lat, lon)| {
            let rows = supplied.row_count();
            if rows == 0 {
                return None;
            }
            let usable = (0..rows)
                .filter(|&row| {
                    let coord = |col: usize| supplied.get(row, col).and_then(|v| v.trim().parse::<f64>().ok());
                    matches!(
                        (coord(lat), coord(lon)),
                        (Some(a), Some(o)) if a.abs() <= 90.0 && o.abs() <= 180.0
                    )
                })
                .count();
            let hit = GeospatialHit::new(
                supplied.column(lat)?.name(),
                supplied.column(lon)?.name(),
                config.geo_granularity.clone(),
                config.geo_radius_km,
            )
            .with_coverage_score(usable as f64 / rows as f64);
            Some(SearchResult::Geospatial(hit))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;
    use crate::provider::{PropertyValue, StaticEntityProperties};

    fn table(csv: &str) -> Table {
        Parser::new().parse_bytes(csv.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_identifier_discovery_threshold() {
        let supplied = table("country,v\nQ30,1\nQ142,2\nQ183,3\nQ30,4\n");
        let source = StaticEntityProperties::new()
            .with_property("Q30", "population", PropertyValue::Quantity(1.0))
            .with_property("Q142", "population", PropertyValue::Quantity(2.0))
            .with_property("Q183", "population", PropertyValue::Quantity(3.0))
            .with_property("Q30", "anthem", PropertyValue::Text("x".into()));

        let mut rng = fastrand::Rng::with_seed(42);
        let results =
            discover_identifier_results(&supplied, &source, &DiscoveryConfig::default(), &mut rng).unwrap();

        assert_eq!(results.len(), 1);
        let SearchResult::Identifier(hit) = &results[0] else {
            panic!("expected identifier hit");
        };
        assert_eq!(hit.target_column, "country");
        assert_eq!(hit.properties, vec!["population".to_string()]);
        assert_eq!(hit.score, 1.0);
    }

    #[test]
    fn test_identifier_discovery_is_seeded() {
        let rows: String = (0..50).map(|i| format!("Q{}\n", i)).collect();
        let supplied = table(&format!("id\n{}", rows));
        let mut source = StaticEntityProperties::new();
        for i in 0..50 {
            if i % 2 == 0 {
                source = source.with_property(format!("Q{}", i), "p", PropertyValue::Quantity(1.0));
            }
        }
        let config = DiscoveryConfig::default()
            .with_max_entity_query_size(10)
            .with_property_threshold(0.0);

        let run = |seed| {
            let mut rng = fastrand::Rng::with_seed(seed);
            discover_identifier_results(&supplied, &source, &config, &mut rng).unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_vector_discovery_ratio() {
        let supplied = table("a,b\nQ1,Q9\nQ2,Q9\nQ3,Q9\nQ4,Q9\nQ5,Q9\nQ6,Q9\nQ7,Q9\nQ8,Q9\nQ10,Q9\nQ11,Q9\nQ12,Q9\n");
        let config = DiscoveryConfig {
            min_unique_entity_ratio: 0.5,
            ..DiscoveryConfig::default()
        };
        let results = discover_vector_results(&supplied, &config);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), "vector:a");
    }

    #[test]
    fn test_geospatial_discovery() {
        let supplied = table("name,latitude,longitude\nLA,34.05,-118.24\nX,,\n");
        let results = discover_geospatial_results(&supplied, &DiscoveryConfig::default());
        assert_eq!(results.len(), 1);
        let SearchResult::Geospatial(hit) = &results[0] else {
            panic!("expected geospatial hit");
        };
        assert_eq!(hit.latitude_column, "latitude");
        assert_eq!(hit.longitude_column, "longitude");
        assert_eq!(hit.coverage_score, 0.5);
    }
}
