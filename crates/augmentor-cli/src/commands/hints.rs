//! Hints command - show the resolved join and how well the rows match.

use colored::Colorize;

use super::plan;
use crate::cli::JoinArgs;

pub fn run(join: JoinArgs, json_output: bool, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let plan = plan(&join)?;
    let guard = plan.guard()?;
    let quality = &plan.outcome.quality;
    let profile = &quality.profile;
    let threshold = guard.threshold(plan.left.row_count());
    let verdict = guard.check(&plan.outcome.pairs, plan.left.row_count());

    if json_output {
        let groups: Vec<_> = plan
            .group_names()
            .into_iter()
            .map(|(left, right)| serde_json::json!({ "left": left, "right": right }))
            .collect();
        let hints = serde_json::json!({
            "left": plan.left_source.origin,
            "right": plan.right_source.origin,
            "join": plan.spec.to_record(),
            "groups": groups,
            "pairs": plan.outcome.pairs.len(),
            "shape": profile.shape(),
            "max_left_fanout": profile.max_left_fanout(),
            "max_right_fanout": profile.max_right_fanout(),
            "threshold": threshold,
            "accepted": verdict.is_ok(),
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&hints)?);
        return Ok(());
    }

    println!(
        "{} {} {} {}",
        "Join hints for".cyan().bold(),
        plan.left_source.origin.white(),
        "+".cyan(),
        plan.right_source.origin.white()
    );
    println!();

    println!("{}", "Key groups:".yellow().bold());
    for (left, right) in plan.group_names() {
        println!("  [{}] = [{}]", left.join(", ").white(), right.join(", ").white());
    }
    let modes: Vec<String> = quality.modes.iter().map(|m| m.to_string()).collect();
    println!("  Modes:    {}", modes.join(", "));
    if quality.temporal {
        println!("  Temporal: {}", "aligned".green());
    }
    println!();

    println!("{}", "Matching:".yellow().bold());
    println!("  Pairs:      {}", plan.outcome.pairs.len().to_string().white().bold());
    println!(
        "  Coverage:   {}/{} rows ({:.1}%)",
        quality.matched_left_rows,
        quality.left_rows,
        quality.coverage * 100.0
    );
    println!("  Similarity: {:.3}", quality.mean_similarity);
    println!();

    println!("{}", "Cardinality:".yellow().bold());
    println!("  Shape:     {}", profile.shape());
    println!(
        "  Fan-out:   {} (left) / {} (right), threshold {:.2}",
        profile.max_left_fanout(),
        profile.max_right_fanout(),
        threshold
    );
    match verdict {
        Ok(()) => println!("  Verdict:   {}", "accepted".green()),
        Err(e) => println!("  Verdict:   {} ({})", "rejected".red(), e),
    }

    if verbose && plan.outcome.preview.row_count() > 0 {
        println!();
        println!("{}", "Preview:".yellow().bold());
        let preview = &plan.outcome.preview;
        println!("  {}", preview.headers().join("\t").dimmed());
        for row in 0..preview.row_count().min(10) {
            println!("  {}", preview.row(row).join("\t"));
        }
    }

    Ok(())
}
