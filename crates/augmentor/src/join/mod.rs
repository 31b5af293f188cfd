//! Join resolution, row matching and cardinality checks.

mod cardinality;
mod matcher;
mod pairs;
mod resolver;
pub mod similarity;
mod spec;

pub use cardinality::{CardinalityGuard, DEFAULT_CARDINALITY_RATIO};
pub use matcher::{JoinMode, MatchOutcome, MatchQuality, MatcherConfig, RowMatcher};
pub use pairs::{CardinalityProfile, RowPairSet};
pub use resolver::{CandidateJoinResolver, CompanionView, DeclaredKeyMapping};
pub use spec::{ColumnDescriptor, ColumnGroup, JoinSpec, JoinSpecRecord};
