//! Disposable per-job environments.
//!
//! Each job gets a unique prefix under the system temp dir and a scoped
//! variable set: `PATH` with the prefix bin prepended, the provider
//! compatibility variables, and the resolved `env.global` entries. The set is
//! handed to each subprocess explicitly; the runner never exports anything
//! into its own process environment.

use std::fs;
use std::path::PathBuf;

use crate::core::config::{EnvEntry, PipelineConfig};
use crate::core::error::{Error, Result};
use crate::core::executor::ExecutionContext;
use crate::core::matrix::Runtime;
use crate::core::secrets;
use crate::log_status;
use crate::utils::shell;

/// Verbatim relink that works around the provisioning sandbox's broken
/// shared-memory device node (known multiprocessing crash). Enters the plan
/// as a synthesized before_install step when `shm_workaround` is set.
pub const SHM_WORKAROUND_COMMAND: &str = "sudo rm -rf /dev/shm && sudo ln -s /run/shm /dev/shm";

pub const SHM_WORKAROUND_STEP_NAME: &str = "shm-workaround";

const MASKED_VALUE: &str = "********";

#[derive(Debug)]
pub struct Environment {
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    vars: Vec<(String, String)>,
    masked: Vec<String>,
}

impl Environment {
    /// Create the disposable prefix and compute the scoped variable set.
    /// Secret references are resolved here, once per job, before anything is
    /// created on disk so a failed resolution leaves no prefix behind.
    pub fn provision(config: &PipelineConfig, runtime: &Runtime) -> Result<Environment> {
        let root = std::env::temp_dir().join(format!("pipewright-{}", uuid::Uuid::new_v4()));
        let bin_dir = root.join("bin");

        let mut vars = Vec::new();
        let mut masked = Vec::new();

        let inherited_path = std::env::var("PATH").unwrap_or_default();
        let path = if inherited_path.is_empty() {
            bin_dir.display().to_string()
        } else {
            format!("{}:{}", bin_dir.display(), inherited_path)
        };
        vars.push(("PATH".to_string(), path));
        vars.push((
            "TRAVIS_PYTHON_VERSION".to_string(),
            runtime.as_str().to_string(),
        ));
        vars.push(("TRAVIS_BUILD_DIR".to_string(), config.resolved_build_dir()));

        for entry in &config.env.global {
            match entry {
                EnvEntry::Plain { name, value } => vars.push((name.clone(), value.clone())),
                EnvEntry::Secret(secret_ref) => {
                    let value = secrets::resolve(secret_ref)?;
                    masked.push(secret_ref.var.clone());
                    vars.push((secret_ref.var.clone(), value));
                }
            }
        }

        fs::create_dir_all(&bin_dir).map_err(|e| {
            Error::provision_failed(format!(
                "Failed to create environment at {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Environment {
            root,
            bin_dir,
            vars,
            masked,
        })
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Execution context for steps of this job.
    pub fn context(&self, working_dir: String) -> ExecutionContext {
        ExecutionContext {
            working_dir: Some(working_dir),
            env: self.vars.clone(),
        }
    }

    /// Shell-quoted `export` lines with secret values masked. Used for
    /// rendered plans and run reports, never for execution.
    pub fn render_exports(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(name, value)| {
                if self.masked.iter().any(|m| m == name) {
                    format!("export {}='{}'", name, MASKED_VALUE)
                } else {
                    format!("export {}={}", name, shell::quote_arg(value))
                }
            })
            .collect()
    }

    /// Remove the prefix. Failures are logged, not fatal.
    pub fn teardown(self) {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            log_status!("env", "Failed to remove {}: {}", self.root.display(), e);
        }
    }
}

/// Export lines for a plan, computed without provisioning anything and
/// without resolving secrets.
pub fn planned_exports(config: &PipelineConfig, runtime: &Runtime) -> Vec<String> {
    let mut exports = vec![
        "export PATH=\"$PIPEWRIGHT_ENV_PREFIX/bin:$PATH\"".to_string(),
        format!("export TRAVIS_PYTHON_VERSION={}", runtime.as_str()),
        format!(
            "export TRAVIS_BUILD_DIR={}",
            shell::quote_arg(&config.resolved_build_dir())
        ),
    ];

    for entry in &config.env.global {
        match entry {
            EnvEntry::Plain { name, value } => {
                exports.push(format!("export {}={}", name, shell::quote_arg(value)));
            }
            EnvEntry::Secret(secret_ref) => {
                exports.push(format!("export {}='{}'", secret_ref.var, MASKED_VALUE));
            }
        }
    }

    exports
}
