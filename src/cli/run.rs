//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers configuration, builds the tokio
//! runtime and dispatches. It prints every error itself; `main` only maps the
//! returned code to the process exit status.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;
use crate::{Config, EmbedgenError, ExitCode};
use embedgen_utils::logging::init_tracing;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let config = match Config::discover(&cli.to_cli_args()) {
        Ok(config) => config,
        Err(err) => return Err(report(&EmbedgenError::Config(err))),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return Err(report(&EmbedgenError::Io(e))),
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Run { .. } => commands::execute_run(&config).await,
            Commands::Skills { .. } => commands::execute_skills(&config),
            Commands::Config => {
                commands::execute_config(&config);
                Ok(())
            }
            Commands::Verify { run_dir } => commands::execute_verify(run_dir).map(|_| ()),
        }
    });

    result.map_err(|err| report(&err))
}

fn report(err: &EmbedgenError) -> ExitCode {
    eprintln!("{}", err.display_for_user());
    err.to_exit_code()
}
