//! Pipeline file model and loading.
//!
//! The pipeline file is YAML with four ordered step phases. Steps are either
//! bare command strings or maps with a per-runtime inclusion predicate
//! (`only`). Version conditionals live in the typed predicate, never in
//! inline shell comparisons.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::matrix::Runtime;
use crate::core::secrets::SecretRef;
use crate::utils::paths;

pub const DEFAULT_CONFIG_FILE: &str = "pipeline.yml";

// ============================================================================
// Raw (on-disk) forms
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPipelineConfig {
    #[serde(default)]
    name: Option<String>,
    runtimes: Vec<serde_yml::Value>,
    #[serde(default)]
    build_dir: Option<String>,
    #[serde(default)]
    shm_workaround: bool,
    #[serde(default)]
    env: RawEnvConfig,
    #[serde(default)]
    before_install: Vec<RawStep>,
    #[serde(default)]
    install: Vec<RawStep>,
    #[serde(default)]
    script: Vec<RawStep>,
    #[serde(default)]
    after_success: Vec<RawStep>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEnvConfig {
    #[serde(default)]
    global: Vec<RawEnvEntry>,
}

// Detailed first: the trailing Command arm takes any value, so unquoted
// scalars (`- true`, `- 127.0.0.1`) still land as commands instead of an
// opaque untagged-enum error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStep {
    Detailed {
        run: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        only: Vec<serde_yml::Value>,
    },
    Command(serde_yml::Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvEntry {
    Secret { secret: String, var: String },
    Ciphertext { secure: String },
    Assignment(String),
}

// ============================================================================
// Typed configuration
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub runtimes: Vec<Runtime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<String>,
    pub shm_workaround: bool,
    pub env: EnvConfig,
    pub before_install: Vec<Step>,
    pub install: Vec<Step>,
    pub script: Vec<Step>,
    pub after_success: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvConfig {
    pub global: Vec<EnvEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvEntry {
    Plain { name: String, value: String },
    Secret(SecretRef),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub run: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<Runtime>,
}

impl Step {
    /// Whether this step is included for the given matrix entry.
    /// An empty predicate means "all entries".
    pub fn applies_to(&self, runtime: &Runtime) -> bool {
        self.only.is_empty() || self.only.contains(runtime)
    }
}

impl PipelineConfig {
    /// The directory steps execute in.
    ///
    /// `build_dir` (tilde-expanded) if configured, else the provider build-dir
    /// variable, else the current directory.
    pub fn resolved_build_dir(&self) -> String {
        if let Some(dir) = &self.build_dir {
            return paths::expand(dir);
        }
        if let Ok(dir) = std::env::var("TRAVIS_BUILD_DIR") {
            if !dir.is_empty() {
                return dir;
            }
        }
        std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ".".to_string())
    }

    /// All secret references declared in `env.global`.
    pub fn secret_refs(&self) -> Vec<&SecretRef> {
        self.env
            .global
            .iter()
            .filter_map(|entry| match entry {
                EnvEntry::Secret(secret_ref) => Some(secret_ref),
                EnvEntry::Plain { .. } => None,
            })
            .collect()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a pipeline file.
pub fn load(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config_not_found(path.display().to_string())
        } else {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        }
    })?;

    parse(&text, &path.display().to_string())
}

/// Parse and validate pipeline YAML.
pub fn parse(text: &str, source: &str) -> Result<PipelineConfig> {
    let raw: RawPipelineConfig = serde_yml::from_str(text)
        .map_err(|e| Error::config_invalid_yaml(source, e.to_string()))?;

    let runtimes = convert_runtimes(raw.runtimes)?;
    let declared: HashSet<Runtime> = runtimes.iter().cloned().collect();

    let env = EnvConfig {
        global: raw
            .env
            .global
            .into_iter()
            .map(convert_env_entry)
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(PipelineConfig {
        name: raw.name,
        runtimes,
        build_dir: raw.build_dir,
        shm_workaround: raw.shm_workaround,
        env,
        before_install: convert_steps(raw.before_install, "before_install", &declared)?,
        install: convert_steps(raw.install, "install", &declared)?,
        script: convert_steps(raw.script, "script", &declared)?,
        after_success: convert_steps(raw.after_success, "after_success", &declared)?,
    })
}

/// YAML scalars (`2.7` unquoted arrives as a number) rendered as strings.
fn scalar_string(value: &serde_yml::Value) -> Option<String> {
    match value {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn convert_runtimes(raw: Vec<serde_yml::Value>) -> Result<Vec<Runtime>> {
    if raw.is_empty() {
        return Err(Error::config_invalid_value(
            "runtimes",
            None,
            "At least one runtime is required",
        ));
    }

    let mut seen = HashSet::new();
    let mut runtimes = Vec::with_capacity(raw.len());
    for raw_value in raw {
        let value = scalar_string(&raw_value).ok_or_else(|| {
            Error::config_invalid_value(
                "runtimes",
                None,
                "Runtime entries must be scalar identifiers like '2.7'",
            )
        })?;
        let runtime = Runtime::parse(&value).map_err(|_| {
            Error::config_invalid_value(
                "runtimes",
                Some(value.clone()),
                "Runtimes must be dotted numeric identifiers like '2.7'",
            )
        })?;
        if !seen.insert(runtime.clone()) {
            return Err(Error::config_invalid_value(
                "runtimes",
                Some(value),
                "Duplicate runtime in matrix",
            ));
        }
        runtimes.push(runtime);
    }

    Ok(runtimes)
}

fn convert_steps(
    raw: Vec<RawStep>,
    phase_key: &str,
    declared: &HashSet<Runtime>,
) -> Result<Vec<Step>> {
    raw.into_iter()
        .map(|step| {
            let (run, name, only) = match step {
                RawStep::Command(value) => {
                    let run = scalar_string(&value).ok_or_else(|| {
                        Error::config_invalid_value(
                            phase_key,
                            None,
                            "Step must be a command string or a map with a 'run' key",
                        )
                    })?;
                    (run, None, Vec::new())
                }
                RawStep::Detailed { run, name, only } => (run, name, only),
            };

            if run.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    phase_key,
                    None,
                    "Step command must not be empty",
                ));
            }

            let only = only
                .into_iter()
                .map(|raw_value| {
                    let value = scalar_string(&raw_value).ok_or_else(|| {
                        Error::config_invalid_value(
                            format!("{}.only", phase_key),
                            None,
                            "Predicate entries must be runtime identifiers",
                        )
                    })?;
                    let runtime = Runtime::parse(&value).map_err(|_| {
                        Error::config_invalid_value(
                            format!("{}.only", phase_key),
                            Some(value.clone()),
                            "Predicate entries must be runtime identifiers",
                        )
                    })?;
                    if !declared.contains(&runtime) {
                        return Err(Error::config_invalid_value(
                            format!("{}.only", phase_key),
                            Some(value),
                            "Predicate references a runtime not declared in the matrix",
                        ));
                    }
                    Ok(runtime)
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Step { name, run, only })
        })
        .collect()
}

fn convert_env_entry(raw: RawEnvEntry) -> Result<EnvEntry> {
    match raw {
        RawEnvEntry::Secret { secret, var } => {
            validate_var_name(&var)?;
            Ok(EnvEntry::Secret(SecretRef { key: secret, var }))
        }
        RawEnvEntry::Ciphertext { .. } => Err(Error::config_invalid_value(
            "env.global",
            None,
            "Embedded ciphertext ('secure:') is not supported",
        )
        .with_hint(
            "Store the value with 'pipewright secret set <key>' and reference it as \
             {secret: <key>, var: <NAME>}",
        )),
        RawEnvEntry::Assignment(assignment) => {
            let parts = assignment
                .split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()));
            match parts {
                Some((name, value)) => {
                    validate_var_name(&name)?;
                    Ok(EnvEntry::Plain { name, value })
                }
                None => Err(Error::config_invalid_value(
                    "env.global",
                    Some(assignment),
                    "Expected NAME=value",
                )),
            }
        }
    }
}

fn validate_var_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| Error::internal_unexpected(e.to_string()))?;

    if !pattern.is_match(name) {
        return Err(Error::config_invalid_value(
            "env.global",
            Some(name.to_string()),
            "Invalid environment variable name",
        ));
    }

    Ok(())
}
