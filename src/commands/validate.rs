use clap::Args;
use pipewright::{config, paths};
use serde::Serialize;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct ValidateArgs {
    /// Pipeline file (default: pipeline.yml)
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOutput {
    pub valid: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub runtimes: Vec<String>,
    pub step_counts: StepCounts,
    pub secret_refs: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCounts {
    pub before_install: usize,
    pub install: usize,
    pub script: usize,
    pub after_success: usize,
}

pub fn run(args: ValidateArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ValidateOutput> {
    let path = paths::config_path(args.config.as_deref());
    let config = config::load(&path)?;

    Ok((
        ValidateOutput {
            valid: true,
            path: path.display().to_string(),
            name: config.name.clone(),
            runtimes: config
                .runtimes
                .iter()
                .map(|rt| rt.as_str().to_string())
                .collect(),
            step_counts: StepCounts {
                before_install: config.before_install.len(),
                install: config.install.len(),
                script: config.script.len(),
                after_success: config.after_success.len(),
            },
            secret_refs: config.secret_refs().len(),
        },
        0,
    ))
}
