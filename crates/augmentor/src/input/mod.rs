//! Input parsing and table handling.

mod parser;
mod source;
mod writer;

pub use parser::{Parser, ParserConfig};
pub use source::{Column, SourceMetadata, Table};
