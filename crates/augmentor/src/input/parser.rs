//! Delimited-text parser with delimiter detection.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::source::{SourceMetadata, Table};
use crate::error::{AugmentError, Result};

/// Candidate delimiters, in tie-break order.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Non-blank lines inspected by delimiter detection.
const SNIFF_LINES: usize = 10;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Fixed field delimiter; detected from content when unset.
    pub delimiter: Option<u8>,
    /// First record holds column names.
    pub has_header: bool,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

impl ParserConfig {
    /// Fix the delimiter instead of detecting it.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Cap the number of rows read.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// Parses delimited tabular data into a [`Table`].
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the table and its source metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Table, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| AugmentError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_source(&contents, path.display().to_string())
    }

    /// Parse raw bytes fetched from `origin` (a path or URL).
    pub fn parse_source(
        &self,
        contents: &[u8],
        origin: impl Into<String>,
    ) -> Result<(Table, SourceMetadata)> {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(contents)?,
        };

        let table = self.parse_bytes(contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let metadata = SourceMetadata::new(
            origin,
            hash,
            contents.len() as u64,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Parse bytes with a known delimiter.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records();

        let headers: Vec<String> = if self.config.has_header {
            match records.next() {
                Some(record) => record?.iter().map(|s| s.trim().to_string()).collect(),
                None => return Err(AugmentError::EmptyData("No header row found".to_string())),
            }
        } else {
            Vec::new()
        };

        let mut rows = Vec::new();
        for result in records {
            if let Some(max) = self.config.max_rows {
                if rows.len() >= max {
                    break;
                }
            }
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let headers = if self.config.has_header {
            headers
        } else {
            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() {
            return Err(AugmentError::EmptyData("No columns found".to_string()));
        }

        log::debug!(
            "parsed {} rows x {} columns (delimiter {:?})",
            rows.len(),
            headers.len(),
            delimiter as char
        );

        Table::from_rows(headers, rows)
    }
}

/// Pick the delimiter whose field count is most consistent over a small sample.
///
/// The header row must split into at least two fields; ties keep the earlier
/// candidate, so tabs win over commas. Single-column input reads as comma separated.
pub(crate) fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let sample: Vec<&[u8]> = bytes
        .split(|&b| b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .take(SNIFF_LINES)
        .collect();
    if sample.is_empty() {
        return Err(AugmentError::EmptyData("nothing to detect a delimiter from".to_string()));
    }
    let sample = sample.join(&b'\n');

    let mut chosen = (b',', 0, 0);
    for &delimiter in DELIMITERS {
        let widths = field_widths(&sample, delimiter);
        let Some(&header) = widths.first() else { continue };
        if header < 2 {
            continue;
        }
        let agreeing = widths.iter().filter(|&&w| w == header).count();
        if (agreeing, header) > (chosen.1, chosen.2) {
            chosen = (delimiter, agreeing, header);
        }
    }
    Ok(chosen.0)
}

/// Fields per record when `sample` is split on `delimiter`, quotes respected.
fn field_widths(sample: &[u8], delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample)
        .records()
        .filter_map(|record| record.ok())
        .map(|record| record.len())
        .collect()
}
