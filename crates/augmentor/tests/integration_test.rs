//! Integration tests for Augmentor.

use std::io::Write;
use tempfile::NamedTempFile;

use augmentor::search::TemporalConstraint;
use augmentor::search::TimeCoverage;
use augmentor::{
    AugmentConfig, AugmentError, Augmentor, CardinalityGuard, CompanionDescriptor, DatamartQuery,
    FileCompanionSource,
    GeospatialHit, Granularity, IdentifierHit, InMemoryCompanionSource, JoinMode, JoinSpec, KeywordHit,
    MatcherConfig, MemoryCache, MergeOptions, AugmentMerger, Parser, PropertyValue, Provenance,
    RowMatcher, RowPairSet, SearchResult, SerializedSearchResult, StaticEmbeddings,
    StaticEntityProperties, StaticGeoResolver, Table, TimeRange, VectorHit, temporal_score,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn table(csv: &str) -> Table {
    Parser::new()
        .parse_bytes(csv.as_bytes(), b',')
        .expect("Failed to parse table")
}

fn keyword(url: &str, right: &str, left: &str) -> SearchResult {
    SearchResult::Keyword(KeywordHit::new(url, CompanionDescriptor::new(url)).with_keys([right], [left]))
}

// =============================================================================
// Core Scenarios
// =============================================================================

#[test]
fn test_scenario_a_identifier_exact_pairs() {
    let left = table("city\nLA\nNYC\nLA\n");
    let right = table("address\nLA\nSF\nNYC\n");
    let matcher = RowMatcher::with_config(MatcherConfig::default().with_mode(JoinMode::Exact));

    let outcome = matcher
        .find_pairs(&left, &right, &JoinSpec::single(0, 0))
        .expect("Matching failed");

    let pairs: Vec<(usize, usize)> = outcome.pairs.iter().collect();
    assert_eq!(pairs, vec![(0, 0), (1, 2), (2, 0)]);
}

#[test]
fn test_scenario_b_one_sided_fanout_accepted() {
    let mut pairs = RowPairSet::new();
    for r in 0..10 {
        pairs.insert(0, r);
    }
    for i in 1..100 {
        pairs.insert(i, i);
    }

    let guard = CardinalityGuard::with_ratio(0.05).unwrap();
    assert_eq!(guard.threshold(100), 5.0);
    assert!(guard.check(&pairs, 100).is_ok());
}

#[test]
fn test_scenario_c_contained_range_scores_one() {
    let query = TimeRange::parse("2020-01-01", "2020-12-31").unwrap();
    let dataset = TimeRange::parse("2020-06-01", "2020-06-30").unwrap();
    assert_eq!(temporal_score(&query, &dataset), 1.0);
}

#[test]
fn test_scenario_d_vacuous_merge() {
    let left = table("city\nLA\n");
    let right = table("address,pop\nLA,1\n");
    let pairs: RowPairSet = [(0, 0)].into_iter().collect();

    let result = AugmentMerger::new().merge(
        &left,
        &right,
        &pairs,
        &MergeOptions::new().with_column_filter(vec![]),
    );
    assert!(matches!(result, Err(AugmentError::VacuousAugmentation(_))));
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_augment_from_files() {
    let supplied_file = create_test_file("city,x\nLA,1\nNYC,2\nBoston,3\n");
    let companion_file = create_test_file("address\tpop\tarea\nLA\t3900000\t1302\nNYC\t8300000\t783\n");

    let augmentor = Augmentor::new().with_companions(FileCompanionSource::new());
    let (supplied, source) = augmentor.load(supplied_file.path()).expect("Load failed");
    assert_eq!(source.format, "csv");

    let hit = KeywordHit::new(
        "population",
        CompanionDescriptor::new(companion_file.path().display().to_string()).with_format("tsv"),
    )
    .with_keys(["address"], ["city"]);

    let merged = augmentor
        .augment(&supplied, &SearchResult::Keyword(hit))
        .expect("Augmentation failed");
    let t = merged.table();

    assert_eq!(t.headers(), vec!["city", "x", "pop", "area"]);
    assert_eq!(t.row_count(), 3);
    assert_eq!(t.get(2, 2), Some(""));
    assert_eq!(merged.augmented_columns(), vec!["pop", "area"]);
    assert_eq!(merged.matched_rows(), 2);
}

#[test]
fn test_temporal_keyword_join() {
    let supplied = table("date,city,v\n2020-01-15,LA,1\n2020-02-10,LA,2\n2020-03-05,NYC,3\n");
    let companion = table("city,month,rate\nLA,2020-01,5\nLA,2020-02,6\nNYC,2020-01,7\n");

    let hit = KeywordHit::new("rates", CompanionDescriptor::new("mem://rates"))
        .with_keys(["city"], ["city"])
        .with_query_time(TemporalConstraint {
            column: "date".into(),
            range: TimeRange::parse("2020-01-15", "2020-03-05").unwrap(),
            granularity: Granularity::Day,
        })
        .with_coverage(TimeCoverage {
            column: "month".into(),
            range: TimeRange::parse("2020-01-01", "2020-02-29").unwrap(),
            granularity: Granularity::Month,
        });

    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://rates", companion));
    let merged = augmentor
        .augment(&supplied, &SearchResult::Keyword(hit))
        .expect("Augmentation failed");

    assert_eq!(merged.table().headers(), vec!["date", "city", "v", "rate"]);
    assert_eq!(
        merged.table().column_values(3).collect::<Vec<_>>(),
        vec!["5", "6", ""]
    );
}

#[test]
fn test_time_join_from_generated_query() {
    let supplied = table("date,city,v\n2020-01-15,LA,1\n2020-02-10,LA,2\n2020-03-05,NYC,3\n");
    let companion = table("city,month,rate\nLA,2020-01,5\nLA,2020-02,6\nNYC,2020-01,7\n");

    let mut rng = fastrand::Rng::with_seed(7);
    let query = DatamartQuery::from_table(&supplied, &[0], 100, &mut rng).expect("Query failed");
    let constraint = query
        .temporal_constraints()
        .expect("Decoding failed")
        .pop()
        .expect("No time constraint");
    assert_eq!(constraint.column, "date");

    let hit = KeywordHit::new("rates", CompanionDescriptor::new("mem://rates"))
        .with_keys(["city"], ["city"])
        .with_query_time(constraint)
        .with_coverage(TimeCoverage {
            column: "month".into(),
            range: TimeRange::parse("2020-01-01", "2020-02-29").unwrap(),
            granularity: Granularity::Month,
        });

    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://rates", companion));
    let merged = augmentor
        .augment(&supplied, &SearchResult::Keyword(hit))
        .expect("Augmentation failed");
    assert_eq!(
        merged.table().column_values(3).collect::<Vec<_>>(),
        vec!["5", "6", ""]
    );
}

#[test]
fn test_small_one_to_one_join_accepted() {
    let supplied = table("city,x\nLA,1\nNYC,2\nBoston,3\nAustin,4\n");
    let companion = table("address,pop\nLA,1\nNYC,2\nBoston,3\nAustin,4\n");
    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://c", companion));

    let merged = augmentor
        .augment(&supplied, &keyword("mem://c", "address", "city"))
        .expect("1:1 join on a small table must pass the guard");
    assert_eq!(merged.matched_rows(), 4);
}

#[test]
fn test_identifier_augmentation() {
    let supplied = table("name,country\nUSA,Q30\nFrance,Q142\nUnknown,\n");
    let augmentor = Augmentor::new().with_properties(
        StaticEntityProperties::new()
            .with_property("Q30", "population", PropertyValue::Quantity(331000000.0))
            .with_property("Q142", "population", PropertyValue::Quantity(67000000.0)),
    );
    let result = SearchResult::Identifier(IdentifierHit::new("country", vec!["population".into()]));

    let merged = augmentor.augment(&supplied, &result).expect("Augmentation failed");
    let t = merged.table();

    assert_eq!(t.headers(), vec!["name", "country", "country_population"]);
    assert_eq!(
        t.column_values(2).collect::<Vec<_>>(),
        vec!["331000000", "67000000", ""]
    );
    assert_eq!(merged.metadata()[2].provenance, Provenance::Augmented);
}

#[test]
fn test_identifier_missing_target_gives_placeholder() {
    let supplied = table("name\nUSA\nFrance\n");
    let augmentor = Augmentor::new();
    let result = SearchResult::Identifier(IdentifierHit::new("country", vec!["population".into()]));

    let merged = augmentor.augment(&supplied, &result).expect("Placeholder expected");
    assert_eq!(merged.table().headers(), vec!["name", "country_population"]);
    assert_eq!(merged.row_count(), 2);
    assert_eq!(merged.matched_rows(), 0);
}

#[test]
fn test_vector_augmentation() {
    let supplied = table("country\nQ30\nQ142\n");
    let augmentor = Augmentor::new().with_embeddings(
        StaticEmbeddings::new()
            .with_vector("Q30", vec![0.1, 0.2])
            .with_vector("Q142", vec![0.3, 0.4]),
    );
    let result = SearchResult::Vector(VectorHit::new("country", vec!["Q30".into(), "Q142".into()]));

    let merged = augmentor.augment(&supplied, &result).expect("Augmentation failed");
    assert_eq!(
        merged.table().headers(),
        vec!["country", "vector_000_of_country", "vector_001_of_country"]
    );
    assert_eq!(merged.table().get(1, 1), Some("0.3"));
}

#[test]
fn test_geospatial_augmentation() {
    let supplied = table("place,latitude,longitude\nLA,34.05,-118.24\nNYC,40.71,-74.0\nX,,\n");
    let augmentor = Augmentor::new()
        .with_geo(
            StaticGeoResolver::new()
                .with_point(34.05, -118.24, "city", "Q65")
                .with_point(40.71, -74.0, "city", "Q60"),
        )
        .with_properties(
            StaticEntityProperties::new()
                .with_property("Q65", "population", PropertyValue::Quantity(3900000.0))
                .with_property("Q60", "population", PropertyValue::Quantity(8300000.0)),
        );

    let hit = GeospatialHit::new("latitude", "longitude", "city", 10.0).with_properties(vec!["population".into()]);
    let entity_column = hit.entity_column();
    let before = supplied.clone();

    let merged = augmentor
        .augment(&supplied, &SearchResult::Geospatial(hit))
        .expect("Augmentation failed");
    let t = merged.table();

    assert_eq!(supplied, before);
    assert_eq!(t.row_count(), 3);
    let entity = t.column_index(&entity_column).unwrap();
    assert_eq!(t.column_values(entity).collect::<Vec<_>>(), vec!["Q65", "Q60", ""]);
    let population = t.column_index(&format!("{}_population", entity_column)).unwrap();
    assert_eq!(
        t.column_values(population).collect::<Vec<_>>(),
        vec!["3900000", "8300000", ""]
    );
}

#[test]
fn test_n_to_m_join_rejected() {
    let supplied = table("k,x\na,1\na,2\na,3\nb,4\n");
    let companion = table("k2,y\na,1\na,2\na,3\nc,4\n");
    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://c", companion));

    let result = augmentor.augment(&supplied, &keyword("mem://c", "k2", "k"));
    assert!(matches!(result, Err(AugmentError::Cardinality { .. })));
}

#[test]
fn test_augment_each_isolates_failures() {
    let supplied = table("city\nLA\n");
    let companion = table("address,pop\nLA,1\n");
    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://ok", companion));

    let outcomes = augmentor.augment_each(
        &supplied,
        &[
            keyword("mem://missing", "address", "city"),
            keyword("mem://ok", "street", "city"),
            keyword("mem://ok", "address", "city"),
        ],
    );

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0].outcome, Err(AugmentError::Materialization(_))));
    assert!(matches!(outcomes[1].outcome, Err(AugmentError::ColumnNotFound { .. })));
    assert!(outcomes[2].outcome.is_ok());
}

#[test]
fn test_cache_returns_stored_result() {
    let supplied = table("city\nLA\n");
    let companion = table("address,pop\nLA,1\n");
    let augmentor = Augmentor::new()
        .with_companions(InMemoryCompanionSource::new().with_table("mem://c", companion))
        .with_cache(MemoryCache::new());
    let result = keyword("mem://c", "address", "city");

    let first = augmentor.augment(&supplied, &result).unwrap();
    let second = augmentor.augment(&supplied, &result).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_serialized_join_reproduces_augmentation() {
    let supplied = table("id,city\n1,LA\n2,NYC\n");
    let companion = table("pop,address\n3900000,LA\n8300000,NYC\n");
    let hit = KeywordHit::new("ds", CompanionDescriptor::new("mem://ds"))
        .with_keys(["address"], ["city"])
        .with_snapshot_of(&companion);
    let result = SearchResult::Keyword(hit);
    let augmentor =
        Augmentor::new().with_companions(InMemoryCompanionSource::new().with_table("mem://ds", companion));

    let spec = result.resolve_join(&supplied, None).unwrap().remove(0);
    let json = result.serialize(&supplied, Some(&spec)).unwrap();

    let (restored, join) = SerializedSearchResult::deserialize(&json).unwrap();
    let replayed = augmentor
        .augment_with_join(&supplied, &restored, &join.unwrap())
        .unwrap();
    let direct = augmentor.augment(&supplied, &result).unwrap();
    assert_eq!(replayed, direct);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_from_file() {
    let file = create_test_file(r#"{"cardinality_ratio": 0.1, "matcher": {"mode": "exact"}}"#);
    let config = AugmentConfig::from_file(file.path()).expect("Config load failed");

    assert_eq!(config.cardinality_ratio, 0.1);
    assert_eq!(config.matcher.mode, JoinMode::Exact);
    assert_eq!(config.matcher.similarity_threshold, 0.8);
    assert_eq!(config.seed, 42);
}

#[test]
fn test_invalid_config_file() {
    let file = create_test_file(r#"{"matcher": {"similarity_threshold": 1.5}}"#);
    assert!(matches!(
        AugmentConfig::from_file(file.path()),
        Err(AugmentError::InvalidInput(_))
    ));
}
