//! Per-runtime plan traces for the built-in sample pipeline.

use pipewright::matrix::Runtime;
use pipewright::{config, defaults, pipeline};

fn sample_config() -> config::PipelineConfig {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.yml");
    std::fs::write(&path, defaults::sample_pipeline()).unwrap();
    config::load(&path).unwrap()
}

fn trace_for(runtime: &str) -> Vec<String> {
    let config = sample_config();
    let runtime = Runtime::parse(runtime).unwrap();
    pipeline::plan(&config, &runtime)
        .trace()
        .iter()
        .map(|step| step.command.clone())
        .collect()
}

#[test]
fn docs_steps_execute_for_the_gated_runtime() {
    let trace = trace_for("2.7");
    assert!(trace.iter().any(|c| c.contains("pip install sphinx")));
    assert!(trace.iter().any(|c| c.contains("make html")));
    assert!(trace.iter().any(|c| c.contains("coveralls")));
    assert!(trace.iter().any(|c| c.contains("update-gh-pages")));
}

#[test]
fn docs_steps_are_absent_from_the_other_runtime_trace() {
    let trace = trace_for("3.4");
    assert!(!trace.iter().any(|c| c.contains("sphinx")));
    assert!(!trace.iter().any(|c| c.contains("make html")));
    assert!(!trace.iter().any(|c| c.contains("update-gh-pages")));
    // The coverage upload itself runs for every runtime.
    assert!(trace.iter().any(|c| c == "coveralls"));
}

#[test]
fn core_dependency_steps_are_identical_across_runtimes() {
    let for_27 = trace_for("2.7");
    let for_34 = trace_for("3.4");

    let ungated: Vec<&String> = for_27
        .iter()
        .filter(|c| !c.contains("sphinx") && !c.contains("make html") && !c.contains("gh-pages"))
        .collect();
    for command in ungated {
        assert!(for_34.contains(command), "missing on 3.4: {}", command);
    }
}

#[test]
fn shm_workaround_leads_the_trace() {
    let trace = trace_for("2.7");
    assert!(trace[0].contains("/dev/shm"));
}

#[test]
fn coverage_run_is_scoped_to_the_package_namespace() {
    let trace = trace_for("3.4");
    assert!(trace
        .iter()
        .any(|c| c.contains("coverage run --source=pyasdf")));
}

#[test]
fn plans_are_idempotent_across_loads() {
    let first = sample_config();
    let second = sample_config();
    for runtime in ["2.7", "3.4"] {
        let rt = Runtime::parse(runtime).unwrap();
        let a = pipeline::plan(&first, &rt);
        let b = pipeline::plan(&second, &rt);
        assert_eq!(a.fingerprint, b.fingerprint);
        let a_cmds: Vec<_> = a.steps.iter().map(|s| &s.command).collect();
        let b_cmds: Vec<_> = b.steps.iter().map(|s| &s.command).collect();
        assert_eq!(a_cmds, b_cmds);
    }
}

#[test]
fn plan_exports_never_leak_secret_values() {
    let config = sample_config();
    let rt = Runtime::parse("2.7").unwrap();
    let plan = pipeline::plan(&config, &rt);
    let token_export = plan
        .exports
        .iter()
        .find(|line| line.contains("COVERALLS_REPO_TOKEN"))
        .unwrap();
    assert!(token_export.contains("********"));
}
