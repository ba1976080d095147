use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Final status of one check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
            CheckStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded result of executing one check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub check_name: String,
    pub status: CheckStatus,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl Outcome {
    pub fn passed(check_name: &str, detail: String, duration_ms: u64) -> Self {
        Self::new(check_name, CheckStatus::Passed, detail, duration_ms)
    }

    pub fn failed(check_name: &str, detail: String, duration_ms: u64) -> Self {
        Self::new(check_name, CheckStatus::Failed, detail, duration_ms)
    }

    pub fn skipped(check_name: &str, reason: &str) -> Self {
        Self::new(check_name, CheckStatus::Skipped, reason.to_string(), 0)
    }

    fn new(check_name: &str, status: CheckStatus, detail: String, duration_ms: u64) -> Self {
        Self {
            check_name: check_name.to_string(),
            status,
            detail,
            timestamp: Utc::now(),
            duration_ms,
        }
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Running,
    Completed,
}

/// Mutable state of a run in progress. Consumed by `finish` into a `Report`.
#[derive(Debug)]
pub struct RunState {
    run_id: String,
    phase: RunPhase,
    outcomes: Vec<Outcome>,
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<Instant>,
}

impl RunState {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            phase: RunPhase::NotStarted,
            outcomes: Vec::new(),
            started_at: None,
            started_instant: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn start(&mut self) {
        self.phase = RunPhase::Running;
        self.started_at = Some(Utc::now());
        self.started_instant = Some(Instant::now());
    }

    pub fn record(&mut self, outcome: Outcome) {
        debug_assert_eq!(self.phase, RunPhase::Running, "outcome recorded outside a run");
        self.outcomes.push(outcome);
    }

    /// Outcomes recorded so far, in execution order
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn finish(mut self) -> Report {
        self.phase = RunPhase::Completed;
        let finished_at = Utc::now();
        let duration_ms = self
            .started_instant
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);

        Report {
            run_id: self.run_id,
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
            duration_ms,
            outcomes: self.outcomes,
        }
    }
}

/// Ordered outcomes of one completed run
///
/// A `Report` is only produced when a run completes and has no mutators,
/// so once handed out it never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    run_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: u64,
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn outcome(&self, check_name: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.check_name == check_name)
    }

    pub fn passed_count(&self) -> usize {
        self.count(CheckStatus::Passed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(CheckStatus::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(CheckStatus::Skipped)
    }

    /// True iff every outcome passed
    pub fn all_passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == CheckStatus::Passed)
    }

    /// Human-readable summary: one line per outcome followed by the totals
    pub fn summarize(&self) -> String {
        let mut lines: Vec<String> = self
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}. {}: {} — {}", i + 1, o.check_name, o.status, o.detail))
            .collect();

        lines.push(format!(
            "{} checks: {} passed, {} failed, {} skipped",
            self.outcomes.len(),
            self.passed_count(),
            self.failed_count(),
            self.skipped_count()
        ));
        lines.join("\n")
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
