pub type CmdResult<T> = pipewright::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod config;
pub mod init;
pub mod plan;
pub mod run;
pub mod secret;
pub mod validate;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run_json($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (pipewright::Result<serde_json::Value>, i32) {
    crate::tty::status("pipewright is working...");

    match command {
        // Commands without global context
        crate::Commands::Init(args) => dispatch!(args, init),

        // Commands with global context
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Validate(args) => dispatch!(args, global, validate),
        crate::Commands::Config(args) => dispatch!(args, global, config),
        crate::Commands::Secret(args) => dispatch!(args, global, secret),
    }
}
