//! Runtime-version matrix.
//!
//! Each declared runtime is one independent matrix entry; the whole pipeline
//! is replayed once per entry. Entries share nothing: every job gets its own
//! disposable environment and its own resolved step list.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::core::config::PipelineConfig;
use crate::core::error::{Error, Result};

/// Environment variable consulted when no `--runtime` flag is given.
/// Kept for interface fidelity with the original CI provider.
pub const RUNTIME_SELECTION_VAR: &str = "TRAVIS_PYTHON_VERSION";

/// A validated runtime-version identifier such as `2.7` or `3.4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Runtime(String);

impl Runtime {
    /// Parse a dotted numeric version identifier.
    pub fn parse(s: &str) -> Result<Self> {
        let pattern = Regex::new(r"^[0-9]+(\.[0-9]+)*$")
            .map_err(|e| Error::internal_unexpected(e.to_string()))?;

        if !pattern.is_match(s) {
            return Err(Error::validation_invalid_argument(
                "runtime",
                format!("'{}' is not a dotted numeric version identifier", s),
                None,
                None,
            ));
        }

        Ok(Runtime(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Choose the matrix entries for a run.
///
/// Precedence: explicit flag, then the provider selection variable, then the
/// full declared matrix. An unknown selection is an error listing the
/// declared entries.
pub fn select(config: &PipelineConfig, flag: Option<&str>) -> Result<Vec<Runtime>> {
    let requested = flag.map(|s| s.to_string()).or_else(|| {
        std::env::var(RUNTIME_SELECTION_VAR)
            .ok()
            .filter(|s| !s.is_empty())
    });

    match requested {
        Some(requested) => {
            let found = config
                .runtimes
                .iter()
                .find(|rt| rt.as_str() == requested)
                .cloned();

            match found {
                Some(rt) => Ok(vec![rt]),
                None => Err(Error::runtime_not_found(
                    requested,
                    config
                        .runtimes
                        .iter()
                        .map(|rt| rt.as_str().to_string())
                        .collect(),
                )),
            }
        }
        None => Ok(config.runtimes.clone()),
    }
}
