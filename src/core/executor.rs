//! Step execution primitives.
//!
//! Every step runs through a `StepExecutor` so the engine can be driven by a
//! recording executor in tests. The production executor shells out with an
//! explicit working directory and an explicit env layer; nothing here mutates
//! the process-wide environment.

use std::process::Command;

use serde::Serialize;

/// Captured result of one executed command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Per-job execution context: working directory plus the scoped env pairs
/// layered over the inherited process environment.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub working_dir: Option<String>,
    pub env: Vec<(String, String)>,
}

pub trait StepExecutor: Send + Sync {
    fn execute(&self, command: &str, ctx: &ExecutionContext) -> CommandOutput;
}

/// Runs commands through the platform shell with captured output.
pub struct ShellExecutor;

impl StepExecutor for ShellExecutor {
    fn execute(&self, command: &str, ctx: &ExecutionContext) -> CommandOutput {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };

        if let Some(dir) = &ctx.working_dir {
            cmd.current_dir(dir);
        }

        cmd.envs(ctx.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        match cmd.output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("Command error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let out = ShellExecutor.execute("echo hello", &ExecutionContext::default());
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn reports_exit_code() {
        let out = ShellExecutor.execute("exit 7", &ExecutionContext::default());
        assert!(!out.success);
        assert_eq!(out.exit_code, 7);
    }

    #[test]
    fn scoped_env_is_visible_to_the_command() {
        let ctx = ExecutionContext {
            working_dir: None,
            env: vec![("PIPEWRIGHT_TEST_VAR".to_string(), "scoped".to_string())],
        };
        let out = ShellExecutor.execute("printf '%s' \"$PIPEWRIGHT_TEST_VAR\"", &ctx);
        assert_eq!(out.stdout, "scoped");
        // The runner's own environment is untouched.
        assert!(std::env::var("PIPEWRIGHT_TEST_VAR").is_err());
    }

    #[test]
    fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext {
            working_dir: Some(dir.path().display().to_string()),
            env: Vec::new(),
        };
        let out = ShellExecutor.execute("pwd", &ctx);
        assert!(out.success);
        assert!(out.stdout.trim().ends_with(
            dir.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .as_ref()
        ));
    }

    #[test]
    fn spawn_failure_is_reported_not_panicked() {
        let ctx = ExecutionContext {
            working_dir: Some("/definitely/not/a/real/directory".to_string()),
            env: Vec::new(),
        };
        let out = ShellExecutor.execute("true", &ctx);
        assert!(!out.success);
        assert_eq!(out.exit_code, -1);
    }
}
