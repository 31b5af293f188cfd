//! Temporal keys: granularity, parsing, ranges and row alignment.

mod aligner;
mod granularity;
mod parse;
mod range;

pub use aligner::TemporalAligner;
pub use granularity::Granularity;
pub use parse::{parse_time_column, parse_timestamp};
pub use range::{temporal_score, TimeRange};
