//! Command-line interface for embedgen
//!
//! - `args`: clap definitions
//! - `run`: entry point and dispatch
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use commands::{ProgressPrinter, execute_verify};
pub use run::run;
