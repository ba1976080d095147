pub mod html;
pub mod json;
pub mod junit;
pub mod types;

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub use types::ChecklistResults;

/// Report formats accepted by `generate_report`
pub const FORMATS: &[&str] = &["json", "html", "junit"];

/// Generate report from saved checklist results
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let results = json::read_results(results_path)?;

    match format {
        "json" => json::generate(&results, output).await,
        "html" => html::generate(&results, output).await,
        "junit" | "xml" => junit::generate(&results, output).await,
        _ => anyhow::bail!("Unknown format: {} (expected one of {})", format, FORMATS.join(", ")),
    }
}

/// Save results plus the HTML and JUnit renderings into `output_dir`
pub fn write_reports(results: &ChecklistResults, output_dir: &Path, render: bool) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let saved = json::write_results(results, output_dir)?;
    println!("    {} {}", "Results saved to:".dimmed(), saved.display());

    if render {
        let html = html::write_report(results, output_dir)?;
        println!("    {} {}", "HTML report:".dimmed(), html.display());
        let xml = junit::write_report(results, output_dir)?;
        println!("    {} {}", "JUnit report:".dimmed(), xml.display());
    }
    Ok(())
}

/// Print every run summary; true when all runs fully passed.
/// The process exits non-zero on false.
pub fn print_summaries(results: &[ChecklistResults]) -> bool {
    let mut all_passed = true;
    for r in results {
        println!("\n{} {}", "■".white().bold(), r.checklist.white().bold());
        println!("{}", r.report.summarize());
        all_passed &= r.report.all_passed();
    }

    if results.is_empty() {
        return true;
    }
    if all_passed {
        println!("\n{} All checklists passed", "✅".green());
    } else {
        println!("\n{} Some checks did not pass", "❌".red());
    }
    all_passed
}
