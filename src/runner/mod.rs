pub mod check;
pub mod context;
pub mod events;
pub mod executor;
pub mod state;
pub mod steps;

use crate::backend::{self, Injection};
use crate::parser::{parse_checklist_file, ChecklistFile};
use crate::report::{self, ChecklistResults};
use crate::utils::config::RunnerConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub use check::{Check, CheckAction, Precondition};
pub use context::RunContext;
pub use events::*;
pub use executor::{ChecklistRunner, RunnerError};
pub use state::*;

/// Options shared by every checklist of one CLI invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub backend: String,
    pub injections: Vec<Injection>,
    /// Directory for results and reports, `None` to skip saving
    pub output: Option<PathBuf>,
    /// Also render HTML and JUnit next to the results file
    pub report: bool,
    pub check_timeout_ms: Option<u64>,
    pub run_timeout_ms: Option<u64>,
    /// Only run checklists carrying one of these tags
    pub tags: Option<Vec<String>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            injections: Vec::new(),
            output: None,
            report: false,
            check_timeout_ms: None,
            run_timeout_ms: None,
            tags: None,
        }
    }
}

/// Run a checklist file or every checklist under a directory
pub async fn run_path(path: &Path, options: &RunOptions) -> Result<Vec<ChecklistResults>> {
    let files = collect_checklist_files(path)?;
    if files.is_empty() {
        println!("{} No checklist files found.", "ℹ".blue());
        return Ok(Vec::new());
    }

    let multiple = files.len() > 1;
    let mut all = Vec::new();
    for file_path in &files {
        let file = parse_checklist_file(file_path)?;
        if !matches_tags(&file, options.tags.as_deref()) {
            log::debug!("Skipping {} (tags {:?})", file_path.display(), file.tags);
            continue;
        }

        let base_dir = file_path.parent().unwrap_or(Path::new("."));
        let output = options.output.as_ref().map(|out| {
            if multiple {
                out.join(output_dir_name(&file))
            } else {
                out.clone()
            }
        });
        all.push(run_checklist(&file, base_dir, output.as_deref(), options).await?);
    }
    Ok(all)
}

/// Run a built-in suite; file checks resolve against `project_dir`
pub async fn run_suite(
    name: &str,
    project_dir: &Path,
    options: &RunOptions,
) -> Result<ChecklistResults> {
    let file = crate::suites::get(name)?.load()?;
    run_checklist(&file, project_dir, options.output.as_deref(), options).await
}

/// Run one parsed checklist against a freshly connected backend
pub async fn run_checklist(
    file: &ChecklistFile,
    base_dir: &Path,
    output: Option<&Path>,
    options: &RunOptions,
) -> Result<ChecklistResults> {
    let name = file.name.clone().unwrap_or_else(|| "checklist".to_string());
    let backend = backend::connect(&options.backend, &options.injections).await?;
    let backend_name = backend.backend_name().to_string();

    // CLI flags win over the checklist header
    let config = RunnerConfig::default()
        .overridden_by(file.timeout_ms, file.run_timeout_ms)
        .overridden_by(options.check_timeout_ms, options.run_timeout_ms);

    let runner = ChecklistRunner::new(backend, config)
        .with_base_dir(base_dir)
        .with_env(file.env.clone())
        .with_label(&name);

    let listener = tokio::spawn(ConsoleEventListener::listen(runner.subscribe()));
    let result = runner.run(&file.to_checks()).await;
    // Closing the channel stops the listener when the run never started
    drop(runner);
    let _ = listener.await;

    let report = result.with_context(|| format!("Checklist '{}' cannot run", name))?;
    let results = ChecklistResults::new(&name, &backend_name, report);

    if let Some(dir) = output {
        report::write_reports(&results, dir, options.report)?;
    }
    Ok(results)
}

/// Checklist files under `path`, sorted for a stable run order
pub fn collect_checklist_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e
                    .path()
                    .extension()
                    .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

fn matches_tags(file: &ChecklistFile, tags: Option<&[String]>) -> bool {
    match tags {
        Some(wanted) if !wanted.is_empty() => file.tags.iter().any(|t| wanted.contains(t)),
        _ => true,
    }
}

fn output_dir_name(file: &ChecklistFile) -> String {
    file.name
        .as_deref()
        .unwrap_or("checklist")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ErrorKind, Operation};

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_collects_yaml_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.yaml", "");
        write(dir.path(), "nested/a.yml", "");
        write(dir.path(), "notes.txt", "");

        let files = collect_checklist_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("b.yaml"), PathBuf::from("nested/a.yml")]);
        assert!(collect_checklist_files(&dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_run_directory_with_tags_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let checks = write(
            dir.path(),
            "checks/auth.yaml",
            "name: auth smoke\ntags: [auth]\n---\n- name: sign up\n  createActor:\n    identity: a@example.com\n    credential: pw\n- name: sign out\n  signOut:\n",
        );
        write(
            dir.path(),
            "checks/files.yaml",
            "name: files\ntags: [files]\n---\n- name: marker\n  fileExists: auth.yaml\n",
        );

        let out = dir.path().join("out");
        let options = RunOptions {
            output: Some(out.clone()),
            report: true,
            ..Default::default()
        };
        let results = run_path(checks.parent().unwrap(), &options).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.report.all_passed()));
        assert!(out.join("auth_smoke/checklist-results.json").exists());
        assert!(out.join("files/junit.xml").exists());

        let options = RunOptions {
            tags: Some(vec!["files".to_string()]),
            ..Default::default()
        };
        let results = run_path(checks.parent().unwrap(), &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].checklist, "files");
    }

    #[tokio::test]
    async fn test_injected_failure_reaches_report() {
        let options = RunOptions {
            injections: vec![Injection {
                operation: Operation::UploadBlob,
                kind: ErrorKind::Unavailable,
            }],
            ..Default::default()
        };

        let results = run_suite("storage", Path::new("."), &options).await.unwrap();
        let report = &results.report;
        assert_eq!(results.backend, "memory");
        assert!(!report.all_passed());

        let upload = report.outcome("upload review file").unwrap();
        assert_eq!(upload.status, CheckStatus::Failed);
        assert!(upload.detail.starts_with("Unavailable"));
        // Checks needing the missing blob fail their precondition
        assert_eq!(
            report.outcome("get review file url").unwrap().detail,
            "variable 'reviewBlob' is not set"
        );
        assert_eq!(
            report.outcome("upload profile file").unwrap().status,
            CheckStatus::Passed
        );
    }

    #[tokio::test]
    async fn test_contract_violation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.yaml", "- name: nothing to do\n");
        let file = parse_checklist_file(&path).unwrap();

        let err = run_checklist(&file, dir.path(), None, &RunOptions::default())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("check 'nothing to do' has no action"));
    }
}
