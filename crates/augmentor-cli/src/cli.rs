//! Command-line surface of the `augmentor` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Augmentor: join companion datasets onto supplied tables
#[derive(Parser)]
#[command(name = "augmentor")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Augment a supplied table with columns from a companion table
    Augment {
        #[command(flatten)]
        join: JoinArgs,

        /// Companion columns to add (comma-separated; default: all non-key columns)
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Show the resolved join and match statistics without merging
    Hints {
        #[command(flatten)]
        join: JoinArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score how well a dataset's time coverage serves a query range
    TemporalScore {
        /// Query range
        #[arg(long, num_args = 2, value_names = ["START", "END"], required = true)]
        query: Vec<String>,

        /// Dataset coverage range
        #[arg(long, num_args = 2, value_names = ["START", "END"], required = true)]
        dataset: Vec<String>,
    },
}

/// Inputs and key columns shared by `augment` and `hints`.
#[derive(Args, Clone, Debug)]
pub struct JoinArgs {
    /// Supplied data file (CSV/TSV)
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Companion data file (CSV/TSV)
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,

    /// Supplied key column (repeat for several keys)
    #[arg(long = "left-key", required = true)]
    pub left_keys: Vec<String>,

    /// Companion key column, paired positionally with --left-key; a single one serves every left key
    #[arg(long = "right-key", required = true)]
    pub right_keys: Vec<String>,

    /// Key comparison mode (auto, exact, fuzzy)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Minimum fuzzy similarity in [0, 1]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Fan-out ratio for rejecting n-to-m joins
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Supplied time column for temporal alignment
    #[arg(long, requires = "right_time")]
    pub left_time: Option<String>,

    /// Companion time column for temporal alignment
    #[arg(long, requires = "left_time")]
    pub right_time: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv, tsv, or json.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
