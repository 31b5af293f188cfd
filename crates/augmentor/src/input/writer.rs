//! Table output: delimited text and JSON records.

use std::io::Write;

use indexmap::IndexMap;
use serde_json::Value;

use super::source::Table;
use crate::error::Result;

impl Table {
    /// Write the table as delimited text with a header row.
    pub fn write_delimited<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        out.write_record(self.headers())?;
        for row in 0..self.row_count() {
            out.write_record(self.row(row))?;
        }
        out.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Render the table as a list of JSON objects, one per row, keys in column order.
    ///
    /// Numeric columns emit numbers where the cell parses; empty cells become `null`.
    pub fn to_json_records(&self) -> Vec<IndexMap<String, Value>> {
        (0..self.row_count())
            .map(|row| {
                self.columns()
                    .iter()
                    .map(|column| {
                        let cell = column.get(row).unwrap_or("");
                        (column.name().to_string(), json_cell(cell, column.metadata.logical_type.is_numeric()))
                    })
                    .collect()
            })
            .collect()
    }
}

fn json_cell(cell: &str, numeric: bool) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if numeric {
        if let Ok(i) = cell.trim().parse::<i64>() {
            return Value::from(i);
        }
        if let Some(n) = cell
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}
