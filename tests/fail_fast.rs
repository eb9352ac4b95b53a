//! End-to-end jobs through the shell executor: fail-fast ordering,
//! publish-phase semantics, and environment scoping.

use std::path::Path;
use std::sync::Arc;

use pipewright::config;
use pipewright::executor::ShellExecutor;
use pipewright::matrix::Runtime;
use pipewright::pipeline::{self, JobStatus, StepStatus};

fn config_in(dir: &Path, body: &str) -> config::PipelineConfig {
    let yaml = format!(
        "runtimes: [\"2.7\", \"3.4\"]\nbuild_dir: \"{}\"\n{}",
        dir.display(),
        body
    );
    config::parse(&yaml, "test").unwrap()
}

#[test]
fn failing_step_halts_the_phase_and_suppresses_publish() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        r#"
install:
  - touch a.marker
  - exit 1
  - touch b.marker
after_success:
  - touch publish.marker
"#,
    );

    let runtime = Runtime::parse("2.7").unwrap();
    let job = pipeline::run_job(&config, &runtime, Arc::new(ShellExecutor), false).unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(dir.path().join("a.marker").exists());
    assert!(!dir.path().join("b.marker").exists());
    assert!(!dir.path().join("publish.marker").exists());

    let statuses: Vec<StepStatus> = job.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Succeeded, StepStatus::Failed, StepStatus::Skipped]
    );
    assert!(job.after_success.is_empty());
}

#[test]
fn publish_failure_leaves_the_job_green() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        r#"
script:
  - touch ran.marker
after_success:
  - exit 1
  - touch publish.marker
"#,
    );

    let runtime = Runtime::parse("2.7").unwrap();
    let job = pipeline::run_job(&config, &runtime, Arc::new(ShellExecutor), false).unwrap();

    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.warnings.len(), 1);
    // Later publish steps still run after an earlier publish failure.
    assert!(dir.path().join("publish.marker").exists());
}

#[test]
fn provider_variables_are_scoped_to_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        r#"
script:
  - printf '%s' "$TRAVIS_PYTHON_VERSION" > rt.txt
"#,
    );

    let path_before = std::env::var("PATH").unwrap_or_default();
    let runtime = Runtime::parse("3.4").unwrap();
    let job = pipeline::run_job(&config, &runtime, Arc::new(ShellExecutor), false).unwrap();

    assert_eq!(job.status, JobStatus::Succeeded);
    let recorded = std::fs::read_to_string(dir.path().join("rt.txt")).unwrap();
    assert_eq!(recorded, "3.4");
    // No process-wide mutation leaked out of the job.
    assert_eq!(std::env::var("PATH").unwrap_or_default(), path_before);
    assert!(std::env::var("TRAVIS_PYTHON_VERSION").is_err());
}

#[test]
fn matrix_entries_run_in_isolated_environments() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        r#"
script:
  - touch "done-$TRAVIS_PYTHON_VERSION"
"#,
    );

    let result = pipeline::run_matrix(
        &config,
        &config.runtimes.clone(),
        Arc::new(ShellExecutor),
        false,
    );

    assert_eq!(result.status, JobStatus::Succeeded);
    assert_eq!(result.summary.total_jobs, 2);
    assert!(dir.path().join("done-2.7").exists());
    assert!(dir.path().join("done-3.4").exists());
    // Separate disposable prefixes, one per job.
    assert_ne!(result.jobs[0].job_id, result.jobs[1].job_id);
}

#[test]
fn unresolved_secret_fails_the_job_before_any_step() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        r#"
env:
  global:
    - secret: test-missing-publish-token
      var: PUBLISH_TOKEN
script:
  - touch ran.marker
"#,
    );

    let result = pipeline::run_matrix(
        &config,
        &[Runtime::parse("2.7").unwrap()],
        Arc::new(ShellExecutor),
        false,
    );

    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.jobs[0].error.is_some());
    assert!(!dir.path().join("ran.marker").exists());
}
