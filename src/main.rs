use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lumi_checklist::backend::{Injection, BACKENDS};
use lumi_checklist::report;
use lumi_checklist::runner::{self, RunOptions};
use lumi_checklist::suites;

#[derive(Parser)]
#[command(name = "lumi-checklist")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Sequential checklist runner for app backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checklist file(s), a directory or a built-in suite
    Run {
        /// Checklist file or directory. With --suite, the project directory for file checks.
        path: Option<PathBuf>,

        /// Built-in suite to run (see `suites`)
        #[arg(short, long)]
        suite: Option<String>,

        /// Backend to run against
        #[arg(short, long, default_value = "memory")]
        backend: String,

        /// Output directory for results and reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate HTML and JUnit reports next to the results
        #[arg(long, default_value = "false")]
        report: bool,

        /// Default per-check timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Timeout for the whole run in milliseconds
        #[arg(long)]
        run_timeout_ms: Option<u64>,

        /// Only run checklists with these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Fail the next call of an operation, e.g. `uploadBlob=Unavailable`. Repeatable.
        #[arg(long = "inject")]
        inject: Vec<Injection>,
    },

    /// List built-in suites
    Suites,

    /// Generate report from saved checklist results
    Report {
        /// Path to checklist-results.json
        results: PathBuf,

        /// Output format (json, html, junit)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            suite,
            backend,
            output,
            report,
            timeout_ms,
            run_timeout_ms,
            tags,
            inject,
        } => {
            if !BACKENDS.contains(&backend.as_str()) {
                anyhow::bail!(
                    "Unknown backend: {} (available: {})",
                    backend,
                    BACKENDS.join(", ")
                );
            }

            println!("  Backend: {}", backend.cyan());
            if let Some(ref tags_list) = tags {
                println!("  Tags: {}", tags_list.join(", ").yellow());
            }
            if let Some(ref out) = output {
                println!("  Output: {}", out.display().to_string().cyan());
            }
            if report {
                println!("  Reports: {}", "Enabled".green());
            }
            for injection in &inject {
                println!(
                    "  Inject: {} on {:?}",
                    injection.kind.to_string().red(),
                    injection.operation
                );
            }

            let options = RunOptions {
                backend,
                injections: inject,
                output,
                report,
                check_timeout_ms: timeout_ms,
                run_timeout_ms,
                tags,
            };

            let results = match (suite, path) {
                (Some(name), project) => {
                    let project = project.unwrap_or_else(|| PathBuf::from("."));
                    println!(
                        "{} Running suite {} against {}",
                        "▶".green().bold(),
                        name.cyan(),
                        project.display()
                    );
                    vec![runner::run_suite(&name, &project, &options).await?]
                }
                (None, Some(path)) => {
                    println!(
                        "{} Running checklists from: {}",
                        "▶".green().bold(),
                        path.display()
                    );
                    runner::run_path(&path, &options).await?
                }
                (None, None) => anyhow::bail!("Give a checklist path or --suite NAME"),
            };

            if !report::print_summaries(&results) {
                std::process::exit(1);
            }
        }

        Commands::Suites => {
            println!("{} Built-in suites:", "📋".to_string().blue());
            for suite in suites::list() {
                println!("  {:<10} {}", suite.name.cyan(), suite.summary);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
