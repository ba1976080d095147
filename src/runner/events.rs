use super::state::Report;
use tokio::sync::broadcast;

/// Run progress events for real-time updates
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        checklist: String,
        check_count: usize,
    },
    RunFinished {
        report: Report,
    },

    CheckStarted {
        index: usize,
        name: String,
    },
    CheckPassed {
        index: usize,
        name: String,
        detail: String,
        duration_ms: u64,
    },
    CheckFailed {
        index: usize,
        name: String,
        error: String,
        duration_ms: u64,
    },
    CheckSkipped {
        index: usize,
        name: String,
        reason: String,
    },
}

/// Event emitter for broadcasting run events
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console listener printing run progress until the run finishes
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;
        let mut current = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Console listener lagged, {} events dropped", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RunEvent::RunStarted {
                    run_id,
                    checklist,
                    check_count,
                } => {
                    println!(
                        "\n{} Checklist {} ({} checks) run {}",
                        "▶".green().bold(),
                        checklist.white().bold(),
                        check_count,
                        run_id.cyan()
                    );
                }

                RunEvent::CheckStarted { index, name } => {
                    let pb = ProgressBar::new_spinner();
                    if !interactive {
                        // Piped output: no escape codes
                        pb.set_draw_target(ProgressDrawTarget::hidden());
                    }
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    current = format!("[{}] {}", index + 1, name);
                    pb.set_message(format!("{}... ", current.dimmed()));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                RunEvent::CheckPassed {
                    detail,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "    {} {} ({}ms) {}",
                        "✓".green(),
                        current,
                        duration_ms,
                        detail.dimmed()
                    );
                }

                RunEvent::CheckFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "    {} {} ({}ms) {}",
                        "✗".red(),
                        current,
                        duration_ms,
                        error.red()
                    );
                }

                RunEvent::CheckSkipped {
                    index,
                    name,
                    reason,
                } => {
                    // Skipped checks never start, so there is no spinner to clear
                    println!(
                        "    {} [{}] {} ({})",
                        "○".yellow(),
                        index + 1,
                        name,
                        reason.dimmed()
                    );
                }

                RunEvent::RunFinished { report } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let status = if report.all_passed() {
                        "PASSED".green().bold()
                    } else {
                        "FAILED".red().bold()
                    };
                    println!("\n{} Checklist finished [{}]", "■".blue().bold(), status);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        report.passed_count().to_string().green(),
                        report.failed_count().to_string().red(),
                        report.skipped_count().to_string().yellow()
                    );
                    println!("  Duration: {}ms", report.duration_ms());
                    break;
                }
            }
        }
    }
}
