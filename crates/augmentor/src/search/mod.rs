//! Search results, queries, ranking, discovery and serialization.
//!
//! A [`SearchResult`] comes from one of four backends. Each variant knows how to
//! materialize its companion table and which columns to join on; the pipeline
//! dispatches on the variant and never on a string tag.

mod discovery;
mod query;
mod ranking;
mod result;
mod serialize;

pub use discovery::{
    discover_geospatial_results, discover_identifier_results, discover_vector_results, DiscoveryConfig,
};
pub use query::{DatamartQuery, TemporalConstraint, VariableConstraint, MAX_ENTITIES_LENGTH, TIME_COLUMN_MARK};
pub use ranking::rank;
pub use result::{GeospatialHit, IdentifierHit, KeywordHit, SearchResult, TimeCoverage, VectorHit};
pub use serialize::{JoinColumnNames, SerializedSearchResult, SERIALIZATION_FORMAT};
