//! CLI argument definitions
//!
//! The clap structures for `embedgen` and the mapping onto [`CliArgs`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::CliArgs;

/// embedgen - generate embedded firmware projects from requirements
#[derive(Parser, Debug)]
#[command(name = "embedgen")]
#[command(about = "Generate ESP-IDF and Arduino projects from plain-language hardware requirements")]
#[command(long_about = r#"
embedgen reads a requirement from a task directory, asks a language model to
plan and write the project, and persists the result under
<task>/runs/<timestamp>/ together with a sha256 manifest and a debug log.

EXAMPLES:
  # Generate a project from tasks/blink/prompt.txt
  embedgen run tasks/blink

  # Use a different model and also produce a wiring diagram slot
  embedgen run tasks/blink --model openai/gpt-4o --enable-diagram

  # List the skills the planner can choose from
  embedgen skills

  # Show the effective configuration and where each value came from
  embedgen config

  # Check a finished run against its manifest
  embedgen verify tasks/blink/runs/2024-03-09_07-05-01

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  The config file is discovered by searching upward from CWD for .embedgen/config.toml
  The API key is read from model.api_key_env (OPENAI_API_KEY), then OPENROUTER_API_KEY
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a project for a task directory
    Run {
        /// Task directory holding the prompt file (defaults to input.task_dir)
        task_dir: Option<PathBuf>,

        /// Prompt file name inside the task directory
        #[arg(long)]
        prompt_file: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature (0.0 - 2.0)
        #[arg(long)]
        temperature: Option<f32>,

        /// Skills directory
        #[arg(long)]
        skills_dir: Option<PathBuf>,

        /// Run the diagram stage alongside code generation
        #[arg(long)]
        enable_diagram: bool,
    },

    /// List available skills
    Skills {
        /// Skills directory
        #[arg(long)]
        skills_dir: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,

    /// Verify a run directory against its manifest
    Verify {
        /// Run directory, e.g. tasks/blink/runs/2024-03-09_07-05-01
        run_dir: PathBuf,
    },
}

impl Cli {
    /// Configuration overrides carried by this invocation.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        let mut args = CliArgs {
            config_path: self.config.clone(),
            ..CliArgs::default()
        };

        match &self.command {
            Commands::Run {
                task_dir,
                prompt_file,
                model,
                temperature,
                skills_dir,
                enable_diagram,
            } => {
                args.task_dir = task_dir.clone();
                args.prompt_file = prompt_file.clone();
                args.model = model.clone();
                args.temperature = *temperature;
                args.skills_dir = skills_dir.clone();
                args.enable_diagram = enable_diagram.then_some(true);
            }
            Commands::Skills { skills_dir } => {
                args.skills_dir = skills_dir.clone();
            }
            Commands::Config | Commands::Verify { .. } => {}
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("embedgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_flags_map_to_cli_args() {
        let cli = parse(&[
            "run",
            "tasks/blink",
            "--model",
            "openai/gpt-4o",
            "--temperature",
            "0.2",
            "--enable-diagram",
            "--config",
            "custom.toml",
        ]);
        let args = cli.to_cli_args();

        assert_eq!(args.task_dir, Some(PathBuf::from("tasks/blink")));
        assert_eq!(args.model.as_deref(), Some("openai/gpt-4o"));
        assert_eq!(args.temperature, Some(0.2));
        assert_eq!(args.enable_diagram, Some(true));
        assert_eq!(args.config_path, Some(PathBuf::from("custom.toml")));
        assert!(args.prompt_file.is_none());
    }

    #[test]
    fn test_diagram_flag_absent_leaves_config_alone() {
        let args = parse(&["run"]).to_cli_args();
        assert_eq!(args.enable_diagram, None);
        assert_eq!(args.task_dir, None);
    }

    #[test]
    fn test_skills_dir_override() {
        let args = parse(&["skills", "--skills-dir", "my-skills"]).to_cli_args();
        assert_eq!(args.skills_dir, Some(PathBuf::from("my-skills")));
    }

    #[test]
    fn test_verify_requires_run_dir() {
        assert!(Cli::try_parse_from(["embedgen", "verify"]).is_err());
        let cli = parse(&["verify", "runs/x", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Verify { .. }));
    }
}
