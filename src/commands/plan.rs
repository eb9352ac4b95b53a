use clap::Args;
use pipewright::pipeline::{self, JobPlan};
use pipewright::{config, matrix, paths};
use serde::Serialize;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct PlanArgs {
    /// Pipeline file (default: pipeline.yml)
    #[arg(long)]
    pub config: Option<String>,

    /// Plan a single matrix entry instead of the full matrix
    #[arg(long)]
    pub runtime: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub plans: Vec<JobPlan>,
}

pub fn run(args: PlanArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<PlanOutput> {
    let config = config::load(&paths::config_path(args.config.as_deref()))?;
    let runtimes = matrix::select(&config, args.runtime.as_deref())?;

    let plans = runtimes
        .iter()
        .map(|runtime| pipeline::plan(&config, runtime))
        .collect();

    Ok((
        PlanOutput {
            name: config.name.clone(),
            plans,
        },
        0,
    ))
}
