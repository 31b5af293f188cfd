//! Value-level type inference for columns.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::input::Table;
use crate::schema::{ColumnMetadata, LogicalType, SemanticTag};
use crate::temporal::{parse_timestamp, Granularity};

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap(), // ISO date
        Regex::new(r"^\d{2}/\d{2}/\d{4}").unwrap(), // US date
        Regex::new(r"^\d{4}/\d{2}/\d{2}").unwrap(), // Alt ISO
        Regex::new(r"^\d{4}-\d{2}$").unwrap(),      // Year-month
    ]
});

/// Knowledge-graph node identifiers (Q-nodes).
static ENTITY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q\d+$").unwrap());

static LOCATION_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(lat|latitude|lon|lng|long|longitude)$").unwrap());

/// Infers logical types and default semantic tags from cell values.
#[derive(Debug, Clone)]
pub struct TypeInferrer {
    /// Minimum fraction of non-null cells that must agree on a type.
    min_agreement: f64,
}

impl TypeInferrer {
    /// Create an inferrer with default settings.
    pub fn new() -> Self {
        Self { min_agreement: 0.9 }
    }

    /// Build column metadata (type, tags, granularity) for a named column.
    pub fn infer_metadata(&self, name: &str, values: &[String]) -> ColumnMetadata {
        let (logical_type, _) = self.infer_column_type(values);
        let mut meta = ColumnMetadata::new(name).with_type(logical_type);

        match logical_type {
            LogicalType::DateTime => {
                meta = meta.with_tags([SemanticTag::Temporal]);
                let parsed: Vec<_> = values
                    .iter()
                    .filter(|v| !Table::is_null_value(v))
                    .filter_map(|v| parse_timestamp(v).ok())
                    .collect();
                meta.time_granularity = Granularity::detect(&parsed);
            }
            LogicalType::EntityId => meta = meta.with_tags([SemanticTag::EntityId]),
            LogicalType::Text => meta = meta.with_tag(SemanticTag::Text),
            LogicalType::Integer | LogicalType::Float => {}
        }

        if LOCATION_NAME_PATTERN.is_match(name.trim()) && logical_type.is_numeric() {
            meta = meta.with_tag(SemanticTag::Location);
        }

        meta
    }

    /// Infer the logical type of a column and a confidence in `[0, 1]`.
    ///
    /// Null cells are ignored; an all-null column is text with zero confidence.
    pub fn infer_column_type(&self, values: &[String]) -> (LogicalType, f64) {
        let present: Vec<&str> = values
            .iter()
            .map(|v| v.as_str())
            .filter(|v| !Table::is_null_value(v))
            .collect();

        if present.is_empty() {
            return (LogicalType::Text, 0.0);
        }

        let mut type_counts: HashMap<LogicalType, usize> = HashMap::new();
        for value in &present {
            *type_counts.entry(self.detect_value_type(value)).or_insert(0) += 1;
        }

        let total = present.len() as f64;
        let count_of = |t: LogicalType| *type_counts.get(&t).unwrap_or(&0);

        // Integers mixed with floats are floats.
        let numeric = count_of(LogicalType::Integer) + count_of(LogicalType::Float);
        if numeric as f64 / total >= self.min_agreement {
            let t = if count_of(LogicalType::Float) > 0 {
                LogicalType::Float
            } else {
                LogicalType::Integer
            };
            return (t, numeric as f64 / total);
        }

        for candidate in [LogicalType::DateTime, LogicalType::EntityId] {
            let share = count_of(candidate) as f64 / total;
            if share >= self.min_agreement {
                return (candidate, share);
            }
        }

        (LogicalType::Text, count_of(LogicalType::Text) as f64 / total)
    }

    /// Structural type of merged values: integer, float, or text.
    ///
    /// Used for augmented columns, whose declared source types are not trusted.
    pub fn infer_structural_type(&self, values: &[String]) -> LogicalType {
        let mut saw_float = false;
        let mut saw_any = false;
        for value in values.iter().filter(|v| !Table::is_null_value(v)) {
            saw_any = true;
            match self.detect_value_type(value) {
                LogicalType::Integer => {}
                LogicalType::Float => saw_float = true,
                _ => return LogicalType::Text,
            }
        }
        match (saw_any, saw_float) {
            (false, _) => LogicalType::Text,
            (true, true) => LogicalType::Float,
            (true, false) => LogicalType::Integer,
        }
    }

    /// Detect the type of a single value.
    pub fn detect_value_type(&self, value: &str) -> LogicalType {
        let trimmed = value.trim();

        if trimmed.parse::<i64>().is_ok() {
            return LogicalType::Integer;
        }

        if trimmed.parse::<f64>().is_ok_and(|f| f.is_finite()) {
            return LogicalType::Float;
        }

        if ENTITY_ID_PATTERN.is_match(trimmed) {
            return LogicalType::EntityId;
        }

        if self.looks_like_date(trimmed) {
            return LogicalType::DateTime;
        }

        LogicalType::Text
    }

    fn looks_like_date(&self, value: &str) -> bool {
        DATE_PATTERNS.iter().any(|pattern| pattern.is_match(value))
    }
}

impl Default for TypeInferrer {
    fn default() -> Self {
        Self::new()
    }
}
