//! Pipeline-file loading and matrix selection through the public API.

use pipewright::{config, defaults, matrix};

#[test]
fn missing_pipeline_file_reports_config_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load(&dir.path().join("pipeline.yml")).unwrap_err();
    assert_eq!(err.code.as_str(), "config.not_found");
    assert!(err.hints.iter().any(|h| h.message.contains("init")));
}

#[test]
fn malformed_yaml_reports_invalid_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.yml");
    std::fs::write(&path, "runtimes: [\"2.7\"\n  - broken").unwrap();
    let err = config::load(&path).unwrap_err();
    assert_eq!(err.code.as_str(), "config.invalid_yaml");
}

#[test]
fn sample_pipeline_round_trips_through_the_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.yml");
    std::fs::write(&path, defaults::sample_pipeline()).unwrap();

    let config = config::load(&path).unwrap();
    assert_eq!(config.name.as_deref(), Some("pyasdf"));
    assert_eq!(
        config
            .runtimes
            .iter()
            .map(|rt| rt.as_str())
            .collect::<Vec<_>>(),
        vec!["2.7", "3.4"]
    );
}

#[test]
fn select_with_flag_picks_a_single_entry() {
    let config = config::parse("runtimes: [\"2.7\", \"3.4\"]\n", "test").unwrap();
    let selected = matrix::select(&config, Some("3.4")).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].as_str(), "3.4");
}

#[test]
fn select_with_unknown_runtime_lists_declared_entries() {
    let config = config::parse("runtimes: [\"2.7\", \"3.4\"]\n", "test").unwrap();
    let err = matrix::select(&config, Some("3.9")).unwrap_err();
    assert_eq!(err.code.as_str(), "runtime.not_found");
    assert!(err.hints.iter().any(|h| h.message.contains("2.7")));
}
