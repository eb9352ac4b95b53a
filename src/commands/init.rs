use std::path::Path;

use clap::Args;
use pipewright::config::DEFAULT_CONFIG_FILE;
use pipewright::defaults;
use serde::Serialize;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct InitArgs {
    /// Destination file (default: pipeline.yml)
    pub path: Option<String>,

    /// Overwrite an existing pipeline file
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput {
    pub path: String,
    pub created: bool,
}

pub fn run_json(args: InitArgs) -> CmdResult<InitOutput> {
    let path = args
        .path
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    if Path::new(&path).exists() && !args.force {
        return Err(pipewright::Error::validation_invalid_argument(
            "path",
            format!("'{}' already exists", path),
            None,
            Some(vec!["Pass --force to overwrite".to_string()]),
        ));
    }

    std::fs::write(&path, defaults::sample_pipeline()).map_err(|e| {
        pipewright::Error::internal_io(e.to_string(), Some(format!("write {}", path)))
    })?;

    Ok((
        InitOutput {
            path,
            created: true,
        },
        0,
    ))
}
