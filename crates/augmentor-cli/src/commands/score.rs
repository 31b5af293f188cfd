//! Temporal-score command - rate a dataset's time coverage against a query range.

use augmentor::{temporal_score, TimeRange};
use colored::Colorize;

pub fn run(query: Vec<String>, dataset: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let [qs, qe] = query.as_slice() else {
        return Err("--query takes START and END".into());
    };
    let [ds, de] = dataset.as_slice() else {
        return Err("--dataset takes START and END".into());
    };

    let query = TimeRange::parse(qs, qe)?;
    let dataset = TimeRange::parse(ds, de)?;
    let score = temporal_score(&query, &dataset);

    let label = if score >= 1.0 {
        "full".green()
    } else if score > 0.0 {
        "partial".yellow()
    } else {
        "none".red()
    };
    println!("{} {:.4} ({} overlap)", "Temporal score:".cyan().bold(), score, label);

    Ok(())
}
