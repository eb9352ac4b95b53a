use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, init, plan, run, secret, validate};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(version = VERSION)]
#[command(about = "Matrix-aware CI pipeline runner with disposable environments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the pipeline across the runtime matrix
    Run(run::RunArgs),
    /// Show the resolved step trace without executing anything
    Plan(plan::PlanArgs),
    /// Validate the pipeline file
    Validate(validate::ValidateArgs),
    /// Write a sample pipeline.yml
    Init(init::InitArgs),
    /// Show the resolved configuration
    Config(config::ConfigArgs),
    /// Manage keychain-backed secrets
    Secret(secret::SecretArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
