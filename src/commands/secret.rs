use clap::{Args, Subcommand};
use pipewright::{config, paths, secrets};
use serde::Serialize;
use serde_json::json;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct SecretArgs {
    #[command(subcommand)]
    pub command: SecretCommand,
}

#[derive(Subcommand)]
pub enum SecretCommand {
    /// Store a secret in the system keychain
    Set {
        /// Secret key referenced from the pipeline file
        key: String,
        /// Value (prompted for on a TTY when omitted)
        value: Option<String>,
    },
    /// Remove a secret from the system keychain
    Remove { key: String },
    /// Verify that every secret reference in the pipeline resolves
    Check {
        /// Pipeline file (default: pipeline.yml)
        #[arg(long)]
        config: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretCheckEntry {
    pub key: String,
    pub var: String,
    pub resolved: bool,
}

pub fn run(
    args: SecretArgs,
    _global: &crate::commands::GlobalArgs,
) -> CmdResult<serde_json::Value> {
    match args.command {
        SecretCommand::Set { key, value } => {
            let value = match value {
                Some(value) => value,
                None => {
                    if !crate::tty::is_stdin_tty() {
                        return Err(pipewright::Error::validation_missing_argument(vec![
                            "value".to_string(),
                        ]));
                    }
                    crate::tty::prompt(&format!("Value for '{}': ", key))?
                }
            };

            if value.is_empty() {
                return Err(pipewright::Error::validation_invalid_argument(
                    "value",
                    "Secret value must not be empty",
                    None,
                    None,
                ));
            }

            secrets::store(&key, &value)?;
            Ok((json!({ "key": key, "stored": true }), 0))
        }
        SecretCommand::Remove { key } => {
            secrets::delete(&key)?;
            Ok((json!({ "key": key, "removed": true }), 0))
        }
        SecretCommand::Check { config: config_flag } => {
            let config = config::load(&paths::config_path(config_flag.as_deref()))?;

            let entries: Vec<SecretCheckEntry> = config
                .secret_refs()
                .into_iter()
                .map(|secret_ref| SecretCheckEntry {
                    key: secret_ref.key.clone(),
                    var: secret_ref.var.clone(),
                    resolved: secrets::resolve(secret_ref).is_ok(),
                })
                .collect();

            let all_resolved = entries.iter().all(|e| e.resolved);
            let exit_code = if all_resolved { 0 } else { 4 };

            Ok((
                json!({ "secrets": entries, "allResolved": all_resolved }),
                exit_code,
            ))
        }
    }
}
