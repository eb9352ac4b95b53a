//! Pipeline planning and execution.
//!
//! A pipeline is four ordered phases. `before_install`, `install` and
//! `script` are fail-fast: the first non-zero exit fails the job, skips every
//! later step in those phases and suppresses `after_success` entirely.
//! `after_success` runs only on a fully green job and its failures are
//! recorded as warnings without changing the job result.
//!
//! Matrix entries are independent jobs executed on their own threads.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::config::{PipelineConfig, Step};
use crate::core::environment::{self, Environment, SHM_WORKAROUND_COMMAND, SHM_WORKAROUND_STEP_NAME};
use crate::core::error::Result;
use crate::core::executor::{ExecutionContext, StepExecutor};
use crate::core::matrix::Runtime;
use crate::log_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeInstall,
    Install,
    Script,
    AfterSuccess,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeInstall => "before_install",
            Phase::Install => "install",
            Phase::Script => "script",
            Phase::AfterSuccess => "after_success",
        }
    }

    /// Whether a failure in this phase fails the job.
    pub fn is_fail_fast(&self) -> bool {
        !matches!(self, Phase::AfterSuccess)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Included,
    Excluded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub command: String,
    pub status: PlanStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPlan {
    pub runtime: Runtime,
    pub steps: Vec<PlannedStep>,
    pub exports: Vec<String>,
    pub fingerprint: String,
}

impl JobPlan {
    /// The executable command trace: included steps only, in order.
    pub fn trace(&self) -> Vec<&PlannedStep> {
        self.steps
            .iter()
            .filter(|step| step.status == PlanStatus::Included)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub command: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_id: String,
    pub runtime: Runtime,
    pub status: JobStatus,
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after_success: Vec<StepResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRunResult {
    pub jobs: Vec<JobResult>,
    pub status: JobStatus,
    pub summary: MatrixSummary,
}

/// Resolve the typed step list for one matrix entry.
///
/// Synthesized provisioning steps come first, then configured steps in phase
/// order. Excluded steps stay in the plan annotated `Excluded` so traces can
/// be audited.
pub fn plan(config: &PipelineConfig, runtime: &Runtime) -> JobPlan {
    let mut steps = Vec::new();

    if config.shm_workaround {
        steps.push(PlannedStep {
            phase: Phase::BeforeInstall,
            name: Some(SHM_WORKAROUND_STEP_NAME.to_string()),
            command: SHM_WORKAROUND_COMMAND.to_string(),
            status: PlanStatus::Included,
        });
    }

    let phases: [(Phase, &[Step]); 4] = [
        (Phase::BeforeInstall, &config.before_install),
        (Phase::Install, &config.install),
        (Phase::Script, &config.script),
        (Phase::AfterSuccess, &config.after_success),
    ];

    for (phase, list) in phases {
        for step in list {
            steps.push(PlannedStep {
                phase,
                name: step.name.clone(),
                command: step.run.clone(),
                status: if step.applies_to(runtime) {
                    PlanStatus::Included
                } else {
                    PlanStatus::Excluded
                },
            });
        }
    }

    JobPlan {
        runtime: runtime.clone(),
        exports: environment::planned_exports(config, runtime),
        fingerprint: fingerprint(config, runtime),
        steps,
    }
}

/// Identity of the provisioned dependency surface for one matrix entry.
/// Identical config and runtime must hash identically across runs.
pub fn fingerprint(config: &PipelineConfig, runtime: &Runtime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(runtime.as_str().as_bytes());

    for entry in &config.env.global {
        match entry {
            crate::core::config::EnvEntry::Plain { name, .. } => {
                hasher.update(b"\0env:");
                hasher.update(name.as_bytes());
            }
            crate::core::config::EnvEntry::Secret(secret_ref) => {
                hasher.update(b"\0secret:");
                hasher.update(secret_ref.var.as_bytes());
            }
        }
    }

    for step in config.install.iter().filter(|s| s.applies_to(runtime)) {
        hasher.update(b"\0install:");
        hasher.update(step.run.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// Run the pipeline for one matrix entry.
///
/// Provisions the disposable environment, executes the included fail-fast
/// steps in order, then the publish phase if everything succeeded. The
/// environment is torn down at job end unless `keep_env`.
pub fn run_job(
    config: &PipelineConfig,
    runtime: &Runtime,
    executor: Arc<dyn StepExecutor>,
    keep_env: bool,
) -> Result<JobResult> {
    let started_at = Utc::now().to_rfc3339();
    log_status!("job", "Starting runtime {}", runtime);

    let env = Environment::provision(config, runtime)?;
    let job_plan = plan(config, runtime);
    let ctx = env.context(config.resolved_build_dir());

    let mut steps = Vec::new();
    let mut after_success = Vec::new();
    let mut warnings = Vec::new();
    let mut failed = false;

    for planned in &job_plan.steps {
        if planned.status == PlanStatus::Excluded || !planned.phase.is_fail_fast() {
            continue;
        }

        if failed {
            steps.push(skipped_result(planned));
            continue;
        }

        let result = execute_planned(planned, executor.as_ref(), &ctx);
        if result.status == StepStatus::Failed {
            failed = true;
            log_status!(
                "job",
                "{} step failed (exit {}): {}",
                planned.phase.as_str(),
                result.exit_code.unwrap_or(-1),
                planned.command
            );
        }
        steps.push(result);
    }

    if !failed {
        for planned in job_plan
            .steps
            .iter()
            .filter(|p| !p.phase.is_fail_fast() && p.status == PlanStatus::Included)
        {
            let result = execute_planned(planned, executor.as_ref(), &ctx);
            if result.status == StepStatus::Failed {
                warnings.push(format!(
                    "after_success step '{}' failed (exit {}); job result unchanged",
                    planned.command,
                    result.exit_code.unwrap_or(-1)
                ));
            }
            after_success.push(result);
        }
    }

    if keep_env {
        log_status!("env", "Keeping environment at {}", env.root.display());
    } else {
        env.teardown();
    }

    Ok(JobResult {
        job_id: uuid::Uuid::new_v4().to_string(),
        runtime: runtime.clone(),
        status: if failed {
            JobStatus::Failed
        } else {
            JobStatus::Succeeded
        },
        steps,
        after_success,
        warnings,
        fingerprint: job_plan.fingerprint,
        error: None,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    })
}

/// Run the pipeline across matrix entries, one thread per job.
///
/// A job-level error (provisioning, unresolved secret) is folded into a
/// failed `JobResult` so sibling jobs still report. Overall status is the
/// logical AND of the job outcomes.
pub fn run_matrix(
    config: &PipelineConfig,
    runtimes: &[Runtime],
    executor: Arc<dyn StepExecutor>,
    keep_env: bool,
) -> MatrixRunResult {
    let jobs = if runtimes.len() <= 1 {
        runtimes
            .iter()
            .map(|rt| job_or_failure(config, rt, Arc::clone(&executor), keep_env))
            .collect()
    } else {
        use std::thread;

        let handles: Vec<_> = runtimes
            .iter()
            .map(|rt| {
                let config = config.clone();
                let rt = rt.clone();
                let executor = Arc::clone(&executor);
                thread::spawn(move || job_or_failure(&config, &rt, executor, keep_env))
            })
            .collect();

        runtimes
            .iter()
            .zip(handles)
            .map(|(rt, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| failure_result(config, rt, "Job thread panicked"))
            })
            .collect()
    };

    summarize(jobs)
}

fn job_or_failure(
    config: &PipelineConfig,
    runtime: &Runtime,
    executor: Arc<dyn StepExecutor>,
    keep_env: bool,
) -> JobResult {
    match run_job(config, runtime, executor, keep_env) {
        Ok(job) => job,
        Err(err) => failure_result(config, runtime, &err.message),
    }
}

fn failure_result(config: &PipelineConfig, runtime: &Runtime, message: &str) -> JobResult {
    let now = Utc::now().to_rfc3339();
    JobResult {
        job_id: uuid::Uuid::new_v4().to_string(),
        runtime: runtime.clone(),
        status: JobStatus::Failed,
        steps: Vec::new(),
        after_success: Vec::new(),
        warnings: Vec::new(),
        fingerprint: fingerprint(config, runtime),
        error: Some(message.to_string()),
        started_at: now.clone(),
        finished_at: now,
    }
}

fn summarize(jobs: Vec<JobResult>) -> MatrixRunResult {
    let succeeded = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Succeeded)
        .count();
    let failed = jobs.len() - succeeded;

    MatrixRunResult {
        status: if failed == 0 {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        },
        summary: MatrixSummary {
            total_jobs: jobs.len(),
            succeeded,
            failed,
        },
        jobs,
    }
}

fn execute_planned(
    planned: &PlannedStep,
    executor: &dyn StepExecutor,
    ctx: &ExecutionContext,
) -> StepResult {
    let start = Instant::now();
    let output = executor.execute(&planned.command, ctx);

    StepResult {
        phase: planned.phase,
        name: planned.name.clone(),
        command: planned.command.clone(),
        status: if output.success {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        },
        exit_code: Some(output.exit_code),
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn skipped_result(planned: &PlannedStep) -> StepResult {
    StepResult {
        phase: planned.phase,
        name: planned.name.clone(),
        command: planned.command.clone(),
        status: StepStatus::Skipped,
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        duration_ms: 0,
    }
}
