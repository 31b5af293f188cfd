//! In-memory table representation and source metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AugmentError, Result};
use crate::inference::TypeInferrer;
use crate::schema::{ColumnMetadata, TableSide};

/// Metadata about where a table was loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File path or URL.
    pub origin: String,
    /// SHA-256 hash of the raw bytes.
    pub hash: String,
    /// Raw size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the table was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a freshly parsed source.
    pub fn new(
        origin: impl Into<String>,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        Self {
            origin: origin.into(),
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// A named column: metadata plus one cell per row.
///
/// Cells are kept as strings; an empty string is a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub metadata: ColumnMetadata,
    pub values: Vec<String>,
}

impl Column {
    /// Create a column from metadata and values.
    pub fn new(metadata: ColumnMetadata, values: Vec<String>) -> Self {
        Self { metadata, values }
    }

    /// Create a text column, inferring its logical type from the values.
    pub fn inferred(name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        let metadata = TypeInferrer::new().infer_metadata(&name, &values);
        Self { metadata, values }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Cell value at a row.
    pub fn get(&self, row: usize) -> Option<&str> {
        self.values.get(row).map(|s| s.as_str())
    }
}

/// Ordered, column-major tabular data.
///
/// Row identity is the positional index. Every transformation in the crate
/// takes a `&Table` and builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
    /// Resource id when the table lives inside a multi-table dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
}

impl Table {
    /// Create a table, checking every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(AugmentError::InvalidInput(format!(
                "column '{}' has {} rows, expected {}",
                bad.name(),
                bad.values.len(),
                row_count
            )));
        }
        Ok(Self {
            columns,
            row_count,
            resource_id: None,
        })
    }

    /// Build a table from row-major data, inferring column metadata.
    ///
    /// Short rows are padded with empty cells and long rows truncated.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let width = headers.len();
        let mut values: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); width];
        for mut row in rows {
            row.resize(width, String::new());
            for (col, cell) in row.into_iter().enumerate() {
                values[col].push(cell);
            }
        }

        let inferrer = TypeInferrer::new();
        let columns = headers
            .into_iter()
            .zip(values)
            .map(|(name, values)| {
                let metadata = inferrer.infer_metadata(&name, &values);
                Column::new(metadata, values)
            })
            .collect();
        Self::new(columns)
    }

    /// Attach a resource id.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Resource id, if the table came from a multi-table dataset.
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by position.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Column names in order.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Column metadata in order.
    pub fn metadata(&self) -> Vec<&ColumnMetadata> {
        self.columns.iter().map(|c| &c.metadata).collect()
    }

    /// Position of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Position of a column, or `ColumnNotFound` for the given side.
    pub fn require_column(&self, name: &str, side: TableSide) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| AugmentError::ColumnNotFound {
                column: name.to_string(),
                side,
            })
    }

    /// Get a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).and_then(|i| self.columns.get(i))
    }

    /// All values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        let column = self.columns.get(index);
        (0..self.row_count).map(move |row| column.and_then(|c| c.get(row)).unwrap_or(""))
    }

    /// A specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.row_count {
            return None;
        }
        self.columns.get(col).and_then(|c| c.get(row))
    }

    /// One row as cell references.
    pub fn row(&self, row: usize) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.get(row).unwrap_or(""))
            .collect()
    }

    /// A new table with one more column appended.
    pub fn with_column(&self, column: Column) -> Result<Self> {
        if !self.columns.is_empty() && column.values.len() != self.row_count {
            return Err(AugmentError::InvalidInput(format!(
                "column '{}' has {} rows, table has {}",
                column.name(),
                column.values.len(),
                self.row_count
            )));
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        let mut table = Self::new(columns)?;
        table.resource_id = self.resource_id.clone();
        Ok(table)
    }

    /// SHA-256 fingerprint over column names and cells.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.name().as_bytes());
            hasher.update([0x1f]);
            for value in &column.values {
                hasher.update(value.as_bytes());
                hasher.update([0x1e]);
            }
            hasher.update([0x1d]);
        }
        format!("sha256:{:x}", hasher.finalize())
    }

    /// Check if a value represents a missing/null value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalType;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_rows_pads_and_infers() {
        let table = Table::from_rows(
            strings(&["city", "population"]),
            vec![strings(&["LA", "3900000"]), strings(&["NYC"])],
        )
        .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 1), Some(""));
        assert_eq!(
            table.column(1).unwrap().metadata.logical_type,
            LogicalType::Integer
        );
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::inferred("a", strings(&["1", "2"])),
            Column::inferred("b", strings(&["1"])),
        ]);
        assert!(matches!(result, Err(AugmentError::InvalidInput(_))));
    }

    #[test]
    fn test_require_column_reports_side() {
        let table = Table::new(vec![Column::inferred("a", strings(&["1"]))]).unwrap();
        match table.require_column("missing", TableSide::Right) {
            Err(AugmentError::ColumnNotFound { column, side }) => {
                assert_eq!(column, "missing");
                assert_eq!(side, TableSide::Right);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_with_column_leaves_original_untouched() {
        let table = Table::new(vec![Column::inferred("a", strings(&["1", "2"]))]).unwrap();
        let wider = table
            .with_column(Column::inferred("b", strings(&["x", "y"])))
            .unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(wider.column_count(), 2);
        assert_eq!(wider.get(1, 1), Some("y"));
    }

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        let a = Table::new(vec![Column::inferred("a", strings(&["1", "2"]))]).unwrap();
        let b = Table::new(vec![Column::inferred("a", strings(&["1", "3"]))]).unwrap();
        assert_eq!(a.content_hash(), a.clone().content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
        assert!(a.content_hash().starts_with("sha256:"));
    }

    #[test]
    fn test_is_null_value() {
        assert!(Table::is_null_value(""));
        assert!(Table::is_null_value("NA"));
        assert!(Table::is_null_value("null"));
        assert!(!Table::is_null_value("0"));
    }
}
