//! File and HTTP companion materializers.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use super::collaborator::{CompanionDescriptor, CompanionSource};
use crate::error::{AugmentError, Result};
use crate::input::{Parser, ParserConfig, Table};

/// Default HTTP timeout for companion downloads.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn parser_for(base: &ParserConfig, descriptor: &CompanionDescriptor) -> Parser {
    let config = match descriptor.delimiter() {
        Some(d) if base.delimiter.is_none() => base.clone().with_delimiter(d),
        _ => base.clone(),
    };
    Parser::with_config(config)
}

/// Reads companion datasets from the local filesystem.
///
/// The descriptor URL is a path, optionally prefixed with `file://`.
#[derive(Debug, Clone, Default)]
pub struct FileCompanionSource {
    config: ParserConfig,
}

impl FileCompanionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl CompanionSource for FileCompanionSource {
    fn fetch_companion_table(&self, descriptor: &CompanionDescriptor) -> Result<Table> {
        let path = descriptor.url.strip_prefix("file://").unwrap_or(&descriptor.url);
        let (table, source) = parser_for(&self.config, descriptor)
            .parse_file(Path::new(path))
            .map_err(|e| AugmentError::Materialization(format!("{}: {}", descriptor.url, e)))?;
        log::debug!(
            "materialized {} ({} rows, {})",
            source.origin,
            source.row_count,
            source.hash
        );
        Ok(table)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Downloads delimited companion files over HTTP.
pub struct HttpCompanionSource {
    client: Client,
    config: ParserConfig,
}

impl HttpCompanionSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AugmentError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: ParserConfig::default(),
        })
    }

    pub fn with_parser_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }
}

impl CompanionSource for HttpCompanionSource {
    fn fetch_companion_table(&self, descriptor: &CompanionDescriptor) -> Result<Table> {
        let fail = |e: reqwest::Error| AugmentError::Materialization(format!("{}: {}", descriptor.url, e));

        let response = self
            .client
            .get(&descriptor.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fail)?;
        let bytes = response.bytes().map_err(fail)?;

        let (table, source) = parser_for(&self.config, descriptor)
            .parse_source(&bytes, descriptor.url.clone())
            .map_err(|e| AugmentError::Materialization(format!("{}: {}", descriptor.url, e)))?;
        log::info!(
            "downloaded {} ({} bytes, {} rows)",
            source.origin,
            source.size_bytes,
            source.row_count
        );
        Ok(table)
    }

    fn name(&self) -> &str {
        "http"
    }
}
