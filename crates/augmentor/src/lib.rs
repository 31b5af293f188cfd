//! Augmentor: companion-dataset join resolution and table augmentation.
//!
//! Given a supplied table and a search hit for a companion dataset, Augmentor
//! decides which columns to join on, which rows correspond, and how to merge the
//! companion's attribute columns without disturbing the supplied rows.
//!
//! # Core Principles
//!
//! - **Non-destructive**: input tables are never modified; every stage returns new values
//! - **Row identity**: the supplied table's row order and row count survive augmentation
//! - **Left wins**: supplied values are authoritative on column-name collisions
//! - **Reproducible**: matching is deterministic and sampling uses an explicit seed
//!
//! # Example
//!
//! ```no_run
//! use augmentor::{Augmentor, CompanionDescriptor, FileCompanionSource, KeywordHit, SearchResult};
//!
//! let augmentor = Augmentor::new().with_companions(FileCompanionSource::new());
//! let (supplied, _) = augmentor.load("cities.csv").unwrap();
//!
//! let hit = KeywordHit::new("population", CompanionDescriptor::new("population.csv"))
//!     .with_keys(["address"], ["city"]);
//! let merged = augmentor.augment(&supplied, &SearchResult::Keyword(hit)).unwrap();
//!
//! println!("Added: {:?}", merged.augmented_columns());
//! ```

pub mod error;
pub mod index;
pub mod inference;
pub mod input;
pub mod join;
pub mod merge;
pub mod provider;
pub mod schema;
pub mod search;
pub mod temporal;

mod augmentor;

pub use crate::augmentor::{AugmentConfig, Augmentor, CandidateOutcome};
pub use error::{AugmentError, Result};
pub use index::ColumnKeyIndex;
pub use input::{Column, Parser, ParserConfig, SourceMetadata, Table};
pub use join::{
    CandidateJoinResolver, CardinalityGuard, CardinalityProfile, ColumnDescriptor, CompanionView,
    DeclaredKeyMapping, JoinMode, JoinSpec, MatchOutcome, MatcherConfig, RowMatcher, RowPairSet,
};
pub use merge::{AugmentMerger, CollisionPolicy, MergeOptions, MergedTable};
pub use provider::{
    Collaborators, CompanionDescriptor, FileCompanionSource, HttpCompanionSource, InMemoryCompanionSource,
    MemoryCache, PropertyValue, StaticEmbeddings, StaticEntityProperties, StaticGeoResolver,
};
pub use schema::{ColumnMetadata, LogicalType, Provenance, SemanticTag, TableSide};
pub use search::{
    rank, DatamartQuery, GeospatialHit, IdentifierHit, KeywordHit, SearchResult, SerializedSearchResult,
    VectorHit,
};
pub use temporal::{temporal_score, Granularity, TemporalAligner, TimeRange};
