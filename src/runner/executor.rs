use super::check::Check;
use super::context::RunContext;
use super::events::{EventEmitter, RunEvent};
use super::state::{Outcome, Report, RunState};
use crate::backend::Backend;
use crate::utils::config::RunnerConfig;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Misuse of the runner, reported before any check executes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("checklist has no checks")]
    EmptyChecklist,
    #[error("check #{index} has no name")]
    MissingName { index: usize },
    #[error("duplicate check name: {name}")]
    DuplicateName { name: String },
    #[error("check '{name}' has no action")]
    MissingAction { name: String },
}

/// Executes checklists one check at a time against an injected backend
pub struct ChecklistRunner {
    backend: Arc<dyn Backend>,
    config: RunnerConfig,
    emitter: EventEmitter,
    base_dir: PathBuf,
    env: HashMap<String, String>,
    label: String,
}

impl ChecklistRunner {
    pub fn new(backend: Arc<dyn Backend>, config: RunnerConfig) -> Self {
        Self {
            backend,
            config,
            emitter: EventEmitter::default(),
            base_dir: PathBuf::from("."),
            env: HashMap::new(),
            label: "checklist".to_string(),
        }
    }

    /// Directory used to resolve relative file paths in checks
    pub fn with_base_dir(mut self, base_dir: &Path) -> Self {
        self.base_dir = base_dir.to_path_buf();
        self
    }

    /// Variables made available to `${...}` substitution
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Name shown in progress events
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Subscribe to run progress events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.emitter.subscribe()
    }

    /// Run `checks` in declaration order and return the completed report.
    ///
    /// Action failures, timeouts and unmet preconditions become `failed`
    /// outcomes and never stop the run. Only contract violations make this
    /// return `Err`, and then nothing has been executed.
    pub async fn run(&self, checks: &[Check]) -> Result<Report, RunnerError> {
        validate(checks)?;

        let run_id = Uuid::new_v4().to_string();
        let mut state = RunState::new(&run_id);
        let mut ctx = RunContext::new(self.backend.clone(), &self.base_dir, self.env.clone());
        let deadline = self.config.run_timeout().map(|d| Instant::now() + d);

        log::info!(
            "Starting run {} of '{}' with {} checks on {} backend",
            run_id,
            self.label,
            checks.len(),
            self.backend.backend_name()
        );
        self.emitter.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            checklist: self.label.clone(),
            check_count: checks.len(),
        });
        state.start();

        for (index, check) in checks.iter().enumerate() {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining == Some(Duration::ZERO) {
                let reason = "run timeout exceeded";
                log::debug!("Skipping '{}': {}", check.name, reason);
                self.emitter.emit(RunEvent::CheckSkipped {
                    index,
                    name: check.name.clone(),
                    reason: reason.to_string(),
                });
                state.record(Outcome::skipped(&check.name, reason));
                continue;
            }

            self.emitter.emit(RunEvent::CheckStarted {
                index,
                name: check.name.clone(),
            });

            ctx.sync_actor().await;
            if let Some(precondition) = &check.precondition {
                if let Err(reason) = precondition.evaluate(&ctx, state.outcomes()) {
                    log::debug!("Precondition of '{}' not met: {}", check.name, reason);
                    self.emitter.emit(RunEvent::CheckFailed {
                        index,
                        name: check.name.clone(),
                        error: reason.clone(),
                        duration_ms: 0,
                    });
                    state.record(Outcome::failed(&check.name, reason, 0));
                    continue;
                }
            }

            let timeout = match (check.timeout.or(self.config.check_timeout()), remaining) {
                (Some(t), Some(r)) => Some(t.min(r)),
                (t, r) => t.or(r),
            };

            let started = Instant::now();
            let result = match &check.action {
                Some(action) => match timeout {
                    Some(limit) => tokio::time::timeout(limit, action.invoke(&mut ctx))
                        .await
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("timeout"))),
                    None => action.invoke(&mut ctx).await,
                },
                // validate() guarantees an action
                None => Err(anyhow::anyhow!("no action")),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(detail) => {
                    log::debug!("Check '{}' passed in {}ms", check.name, duration_ms);
                    self.emitter.emit(RunEvent::CheckPassed {
                        index,
                        name: check.name.clone(),
                        detail: detail.clone(),
                        duration_ms,
                    });
                    state.record(Outcome::passed(&check.name, detail, duration_ms));
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    log::debug!("Check '{}' failed in {}ms: {}", check.name, duration_ms, error);
                    self.emitter.emit(RunEvent::CheckFailed {
                        index,
                        name: check.name.clone(),
                        error: error.clone(),
                        duration_ms,
                    });
                    state.record(Outcome::failed(&check.name, error, duration_ms));
                }
            }
        }

        let report = state.finish();
        log::info!(
            "Run {} finished: {} passed, {} failed, {} skipped",
            report.run_id(),
            report.passed_count(),
            report.failed_count(),
            report.skipped_count()
        );
        self.emitter.emit(RunEvent::RunFinished {
            report: report.clone(),
        });
        Ok(report)
    }
}

fn validate(checks: &[Check]) -> Result<(), RunnerError> {
    if checks.is_empty() {
        return Err(RunnerError::EmptyChecklist);
    }

    let mut seen = HashSet::new();
    for (index, check) in checks.iter().enumerate() {
        if check.name.trim().is_empty() {
            return Err(RunnerError::MissingName { index });
        }
        if !seen.insert(check.name.as_str()) {
            return Err(RunnerError::DuplicateName {
                name: check.name.clone(),
            });
        }
        if check.action.is_none() {
            return Err(RunnerError::MissingAction {
                name: check.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBackend};
    use crate::parser::types::{
        CreateActorParams, CreateRecordParams, ReadRecordParams, RecordRefParams, Step,
    };
    use crate::runner::check::Precondition;
    use crate::runner::state::CheckStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runner(backend: Arc<MemoryBackend>) -> ChecklistRunner {
        ChecklistRunner::new(backend, RunnerConfig::default())
    }

    fn ok(name: &str) -> Check {
        let detail = format!("{} done", name);
        Check::from_fn(name, move || {
            let detail = detail.clone();
            async move { Ok(detail) }
        })
    }

    fn failing(name: &str, message: &'static str) -> Check {
        Check::from_fn(name, move || async move { Err(anyhow::anyhow!(message)) })
    }

    fn statuses(report: &Report) -> Vec<CheckStatus> {
        report.outcomes().iter().map(|o| o.status).collect()
    }

    #[tokio::test]
    async fn test_outcomes_follow_declaration_order() {
        let report = runner(Arc::new(MemoryBackend::new()))
            .run(&[ok("one"), failing("two", "boom"), ok("three"), failing("four", "bang")])
            .await
            .unwrap();

        let names: Vec<_> = report.outcomes().iter().map(|o| o.check_name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three", "four"]);
        assert_eq!(
            statuses(&report),
            vec![
                CheckStatus::Passed,
                CheckStatus::Failed,
                CheckStatus::Passed,
                CheckStatus::Failed
            ]
        );
        assert_eq!(report.outcomes()[1].detail, "boom");
        assert_eq!(report.outcomes()[2].detail, "three done");
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn test_actor_record_scenario_all_pass() {
        let backend = Arc::new(MemoryBackend::new());
        let checks = vec![
            Check::new("create actor").with_action(Step::CreateActor(CreateActorParams {
                identity: "test${timestamp}@example.com".to_string(),
                credential: "password123".to_string(),
                sign_in_if_exists: false,
            })),
            Check::new("create record")
                .requires(Precondition::Authenticated)
                .with_action(Step::CreateRecord(CreateRecordParams {
                    collection: "reviews".to_string(),
                    payload: json!({"authorId": "${actor.id}", "sentiment": "positive"}),
                    save_as: Some("reviewId".to_string()),
                })),
            Check::new("delete record").with_action(Step::DeleteRecord(RecordRefParams {
                collection: "reviews".to_string(),
                id: "${reviewId}".to_string(),
            })),
        ];

        let report = runner(backend.clone()).run(&checks).await.unwrap();
        assert_eq!(report.outcomes().len(), 3);
        assert!(report.all_passed(), "{}", report.summarize());
        assert_eq!(backend.record_count("reviews").await, 0);
    }

    #[tokio::test]
    async fn test_unmet_precondition_skips_action_only() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();
        let guarded = Check::from_fn("create record", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("created".to_string())
            }
        })
        .requires(Precondition::Authenticated);

        let read = Check::new("read record").with_action(Step::ReadRecord(ReadRecordParams {
            collection: "reviews".to_string(),
            id: "missing".to_string(),
            expect: crate::parser::types::Expectation::Absent,
        }));

        let report = runner(Arc::new(MemoryBackend::new()))
            .run(&[guarded, read])
            .await
            .unwrap();

        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(statuses(&report), vec![CheckStatus::Failed, CheckStatus::Passed]);
        assert_eq!(report.outcomes()[0].detail, "no authenticated actor");
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn test_authenticated_follows_backend_session() {
        let backend = Arc::new(MemoryBackend::new());
        let signer = backend.clone();
        let sign_up = Check::from_fn("sign up", move || {
            let backend = signer.clone();
            async move {
                let actor = backend.create_actor("a@example.com", "password123").await?;
                Ok(format!("created {}", actor.id))
            }
        });
        let record = Check::new("create record")
            .requires(Precondition::Authenticated)
            .with_action(Step::CreateRecord(CreateRecordParams {
                collection: "reviews".to_string(),
                payload: json!({"authorId": "${actor.id}"}),
                save_as: None,
            }));

        let report = runner(backend.clone())
            .run(&[
                sign_up,
                ok("guarded").requires(Precondition::Authenticated),
                record,
            ])
            .await
            .unwrap();

        assert!(report.all_passed(), "{}", report.summarize());
        assert_eq!(backend.record_count("reviews").await, 1);
    }

    #[tokio::test]
    async fn test_session_changes_outside_steps_are_seen() {
        let backend = Arc::new(MemoryBackend::new());
        backend.create_actor("a@example.com", "password123").await.unwrap();

        let report = runner(backend.clone())
            .run(&[ok("guarded").requires(Precondition::Authenticated)])
            .await
            .unwrap();
        assert!(report.all_passed(), "{}", report.summarize());

        let signer = backend.clone();
        let sign_out = Check::from_fn("sign out", move || {
            let backend = signer.clone();
            async move {
                backend.deauthenticate().await?;
                Ok("signed out".to_string())
            }
        });
        let report = runner(backend)
            .run(&[sign_out, ok("guarded").requires(Precondition::Authenticated)])
            .await
            .unwrap();
        assert_eq!(report.outcomes()[1].status, CheckStatus::Failed);
        assert_eq!(report.outcomes()[1].detail, "no authenticated actor");
    }

    #[tokio::test]
    async fn test_slow_backend_step_times_out() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(300)));
        let create = Check::new("create actor")
            .with_action(Step::CreateActor(CreateActorParams {
                identity: "slow@example.com".to_string(),
                credential: "password123".to_string(),
                sign_in_if_exists: false,
            }))
            .with_timeout(Duration::from_millis(20));

        let report = runner(backend.clone()).run(&[create, ok("next")]).await.unwrap();

        assert_eq!(report.outcomes()[0].status, CheckStatus::Failed);
        assert_eq!(report.outcomes()[0].detail, "timeout");
        assert_eq!(report.outcomes()[1].status, CheckStatus::Passed);
        // The abandoned call never reached the backend state
        assert!(backend.current_actor().await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identity_does_not_stop_run() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .inject_failure(
                crate::backend::Operation::CreateActor,
                BackendError::DuplicateIdentity("a@example.com".to_string()),
            )
            .await;

        let checks = vec![
            Check::new("create actor").with_action(Step::CreateActor(CreateActorParams {
                identity: "a@example.com".to_string(),
                credential: "password123".to_string(),
                sign_in_if_exists: false,
            })),
            ok("after"),
        ];
        let report = runner(backend).run(&checks).await.unwrap();

        assert_eq!(report.outcomes().len(), 2);
        assert_eq!(report.outcomes()[0].status, CheckStatus::Failed);
        assert!(report.outcomes()[0].detail.starts_with("DuplicateIdentity"));
        assert_eq!(report.outcomes()[1].status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn test_action_timeout_is_a_failure() {
        let slow = Check::from_fn("slow", || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok("late".to_string())
        })
        .with_timeout(Duration::from_millis(20));

        let report = runner(Arc::new(MemoryBackend::new()))
            .run(&[slow, ok("next")])
            .await
            .unwrap();

        assert_eq!(report.outcomes()[0].status, CheckStatus::Failed);
        assert_eq!(report.outcomes()[0].detail, "timeout");
        assert_eq!(report.outcomes()[1].status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn test_run_timeout_skips_remaining() {
        let config = RunnerConfig {
            check_timeout_ms: None,
            run_timeout_ms: Some(50),
        };
        let slow = Check::from_fn("slow", || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok("late".to_string())
        });

        let report = ChecklistRunner::new(Arc::new(MemoryBackend::new()), config)
            .run(&[ok("first"), slow, ok("third"), ok("fourth")])
            .await
            .unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                CheckStatus::Passed,
                CheckStatus::Failed,
                CheckStatus::Skipped,
                CheckStatus::Skipped
            ]
        );
        assert_eq!(report.outcomes()[1].detail, "timeout");
        assert_eq!(report.outcomes()[2].detail, "run timeout exceeded");
    }

    #[tokio::test]
    async fn test_contract_violations() {
        let runner = runner(Arc::new(MemoryBackend::new()));

        assert_eq!(runner.run(&[]).await.unwrap_err(), RunnerError::EmptyChecklist);
        assert_eq!(
            runner.run(&[ok("a"), ok(" ")]).await.unwrap_err(),
            RunnerError::MissingName { index: 1 }
        );
        assert_eq!(
            runner.run(&[ok("a"), ok("a")]).await.unwrap_err(),
            RunnerError::DuplicateName {
                name: "a".to_string()
            }
        );
        assert_eq!(
            runner.run(&[Check::new("bare")]).await.unwrap_err(),
            RunnerError::MissingAction {
                name: "bare".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_contract_violation_runs_nothing() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();
        let counted = Check::from_fn("counted", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(String::new())
            }
        });

        let result = runner(Arc::new(MemoryBackend::new()))
            .run(&[counted, Check::new("bare")])
            .await;
        assert!(result.is_err());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_track_each_check() {
        let runner = runner(Arc::new(MemoryBackend::new())).with_label("events");
        let mut events = runner.subscribe();

        runner.run(&[ok("a"), failing("b", "nope")]).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(match event {
                RunEvent::RunStarted { .. } => "run-started",
                RunEvent::CheckStarted { .. } => "started",
                RunEvent::CheckPassed { .. } => "passed",
                RunEvent::CheckFailed { .. } => "failed",
                RunEvent::CheckSkipped { .. } => "skipped",
                RunEvent::RunFinished { .. } => "run-finished",
            });
        }
        assert_eq!(
            seen,
            vec!["run-started", "started", "passed", "started", "failed", "run-finished"]
        );
    }
}
