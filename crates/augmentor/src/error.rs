//! Error types for the augmentor library.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::TableSide;

/// Main error type for augmentation operations.
#[derive(Debug, Error)]
pub enum AugmentError {
    /// A local file could not be read or written.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Descriptor, config or dataset JSON failed to (de)serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty file or no data to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A declared key column is absent from one of the tables.
    #[error("Column '{column}' not found in {side} table")]
    ColumnNotFound { column: String, side: TableSide },

    /// The join fans out on both sides (n-to-m) and was rejected.
    #[error(
        "Rejected n-to-m join: max left fan-out {max_left_fanout}, max right fan-out \
         {max_right_fanout}, threshold {threshold}"
    )]
    Cardinality {
        max_left_fanout: usize,
        max_right_fanout: usize,
        threshold: f64,
    },

    /// A companion dataset could not be materialized.
    #[error("Materialization failed: {0}")]
    Materialization(String),

    /// The merge would not add a single column.
    #[error("Vacuous augmentation: {0}")]
    VacuousAugmentation(String),

    /// Malformed input (bad join mode, invalid return format, out-of-range pair...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A temporal column could not be interpreted as date/time values.
    #[error("Temporal error: {0}")]
    Temporal(String),

    /// No join specification could be resolved for a search result.
    #[error("No join candidate: {0}")]
    NoJoinCandidate(String),

    /// The wall-clock budget ran out between pipeline stages.
    #[error("Augmentation exceeded its {budget_ms} ms budget during {stage}")]
    Timeout { stage: String, budget_ms: u64 },

    /// Cache collaborator failure or an augmentation that failed on a previous run.
    #[error("Cache error: {0}")]
    Cache(String),
}

/// Result type alias for augmentation operations.
pub type Result<T> = std::result::Result<T, AugmentError>;
