//! Augment command - merge companion columns onto the supplied table.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use augmentor::{AugmentMerger, MergeOptions, MergedTable};
use colored::Colorize;

use super::plan;
use crate::cli::{JoinArgs, OutputFormat};

pub fn run(
    join: JoinArgs,
    columns: Option<Vec<String>>,
    output: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = plan(&join)?;
    plan.guard()?.check(&plan.outcome.pairs, plan.left.row_count())?;

    let right_keys: BTreeSet<usize> = plan
        .spec
        .column_number_pairs()
        .into_iter()
        .flat_map(|(_, r)| r)
        .collect();
    let mut options = MergeOptions::new().with_right_key_columns(right_keys.into_iter().collect());

    if let Some(names) = columns {
        let mut filter = Vec::new();
        for name in &names {
            match plan.right.column_index(name) {
                Some(index) => filter.push(index),
                None => log::warn!("column '{}' not found in {}", name, join.right.display()),
            }
        }
        options = options.with_column_filter(filter);
    }

    let merged = AugmentMerger::new().merge(&plan.left, &plan.right, &plan.outcome.pairs, &options)?;

    // Summary on stderr when data is on stdout.
    let summary = summarize(&merged, &plan.left_source.origin, verbose);
    match &output {
        Some(path) => {
            let file = File::create(path)?;
            write_table(&merged, BufWriter::new(file), &format)?;
            println!("{}", summary);
            println!("Saved to {}", path.display().to_string().cyan());
        }
        None => {
            write_table(&merged, io::stdout().lock(), &format)?;
            eprintln!("{}", summary);
        }
    }

    Ok(())
}

fn write_table<W: Write>(
    merged: &MergedTable,
    mut writer: W,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Csv => merged.table().write_delimited(writer, b',')?,
        OutputFormat::Tsv => merged.table().write_delimited(writer, b'\t')?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &merged.table().to_json_records())?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn summarize(merged: &MergedTable, origin: &str, verbose: bool) -> String {
    let added = merged.augmented_columns();
    let mut lines = vec![format!(
        "{} {} with {} columns ({}/{} rows matched)",
        "Augmented".green().bold(),
        origin.white(),
        added.len().to_string().white().bold(),
        merged.matched_rows(),
        merged.row_count()
    )];
    if verbose {
        for name in added {
            lines.push(format!("  + {}", name.cyan()));
        }
    }
    lines.join("\n")
}
