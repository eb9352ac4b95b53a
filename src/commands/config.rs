use clap::Args;
use pipewright::{config, paths};
use serde_json::json;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    /// Pipeline file (default: pipeline.yml)
    #[arg(long)]
    pub config: Option<String>,
}

/// Show the resolved configuration. Secret entries surface as references
/// (key + target var); values live only in the keychain.
pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<serde_json::Value> {
    let path = paths::config_path(args.config.as_deref());
    let config = config::load(&path)?;

    let mut value = serde_json::to_value(&config).map_err(|e| {
        pipewright::Error::internal_json(e.to_string(), Some("serialize config".to_string()))
    })?;

    if let Some(obj) = value.as_object_mut() {
        obj.insert("path".to_string(), json!(path.display().to_string()));
        obj.insert(
            "resolvedBuildDir".to_string(),
            json!(config.resolved_build_dir()),
        );
    }

    Ok((value, 0))
}
