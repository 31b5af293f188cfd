//! Augmentor CLI - companion-dataset joins from the command line.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Augment {
            join,
            columns,
            output,
            format,
        } => commands::augment::run(join, columns, output, format, cli.verbose),

        Commands::Hints { join, json } => commands::hints::run(join, json, cli.verbose),

        Commands::TemporalScore { query, dataset } => commands::score::run(query, dataset),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
