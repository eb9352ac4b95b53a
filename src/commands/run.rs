use std::sync::Arc;

use clap::Args;
use pipewright::executor::ShellExecutor;
use pipewright::pipeline::{self, JobStatus, MatrixRunResult};
use pipewright::{config, matrix, paths};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline file (default: pipeline.yml)
    #[arg(long)]
    pub config: Option<String>,

    /// Run a single matrix entry instead of the full matrix
    #[arg(long)]
    pub runtime: Option<String>,

    /// Keep the disposable environments for inspection
    #[arg(long)]
    pub keep_env: bool,
}

pub fn run(args: RunArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<MatrixRunResult> {
    let config = config::load(&paths::config_path(args.config.as_deref()))?;
    let runtimes = matrix::select(&config, args.runtime.as_deref())?;

    let result = pipeline::run_matrix(&config, &runtimes, Arc::new(ShellExecutor), args.keep_env);

    let exit_code = if result.status == JobStatus::Succeeded {
        0
    } else {
        20
    };
    Ok((result, exit_code))
}
