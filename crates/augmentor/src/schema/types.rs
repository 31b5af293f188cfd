//! Core type definitions for column metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    /// Free text or categorical values.
    #[default]
    Text,
    /// Whole numbers.
    Integer,
    /// Decimal or scientific notation.
    Float,
    /// Dates, timestamps and year-month strings.
    DateTime,
    /// Normalized entity identifiers (knowledge-graph node ids).
    EntityId,
}

impl LogicalType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, LogicalType::Integer | LogicalType::Float)
    }

    /// Structural type name used in exported metadata.
    pub fn structural_name(&self) -> &'static str {
        match self {
            LogicalType::Text | LogicalType::EntityId => "str",
            LogicalType::Integer => "int",
            LogicalType::Float => "float",
            LogicalType::DateTime => "datetime",
        }
    }
}

/// Semantic tag attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticTag {
    /// Time values; eligible for temporal alignment.
    Temporal,
    /// Entity identifiers; joined by exact equality.
    EntityId,
    /// Plain attribute column.
    Attribute,
    /// Free text; joined by fuzzy matching.
    Text,
    /// Geographic location (latitude or longitude).
    Location,
}

/// Whether a column came from the supplied data or was added by augmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Original,
    Augmented,
}

/// Side of a join a table or column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSide {
    /// Supplied (user) data.
    Left,
    /// Companion data found by search.
    Right,
}

impl fmt::Display for TableSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSide::Left => write!(f, "left"),
            TableSide::Right => write!(f, "right"),
        }
    }
}
