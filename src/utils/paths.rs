//! Path expansion and pipeline-file resolution.

use std::path::PathBuf;

use crate::core::config::DEFAULT_CONFIG_FILE;

/// Expand a leading tilde to the user's home directory.
pub fn expand(path: &str) -> String {
    shellexpand::tilde(path).to_string()
}

/// Resolve the pipeline file path from an optional `--config` flag.
pub fn config_path(flag: Option<&str>) -> PathBuf {
    match flag {
        Some(path) => PathBuf::from(expand(path)),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}
