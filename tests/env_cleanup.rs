//! Provisioning failures must not leave disposable prefixes behind.
//!
//! Runs alone in this binary: it redirects TMPDIR so every prefix the run
//! creates lands in an inspectable directory.

use std::sync::Arc;

use pipewright::config;
use pipewright::executor::ShellExecutor;
use pipewright::matrix::Runtime;
use pipewright::pipeline::{self, JobStatus};

#[test]
fn unresolved_secret_leaves_no_prefix_behind() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("TMPDIR", tmp.path());

    let yaml = format!(
        r#"
runtimes: ["2.7"]
build_dir: "{}"
env:
  global:
    - secret: test-missing-cleanup-token
      var: TOKEN
script:
  - touch ran.marker
"#,
        tmp.path().display()
    );
    let config = config::parse(&yaml, "test").unwrap();

    let result = pipeline::run_matrix(
        &config,
        &[Runtime::parse("2.7").unwrap()],
        Arc::new(ShellExecutor),
        false,
    );
    std::env::remove_var("TMPDIR");

    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.jobs[0].error.is_some());

    let leaked: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("pipewright-"))
        .collect();
    assert!(leaked.is_empty(), "leaked prefixes: {:?}", leaked);
}
