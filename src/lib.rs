//! embedgen: generate embedded firmware projects from plain-language
//! requirements.
//!
//! The workspace is split into focused crates; this crate wires them into the
//! `embedgen` binary and re-exports the stable API.
//!
//! - `embedgen-utils`: errors, exit codes, path guarding, atomic writes, logging
//! - `embedgen-config`: layered configuration
//! - `embedgen-llm`: model gateway and prompts
//! - `embedgen-skills`: skill catalog
//! - `embedgen-engine`: stages, workflow engine, artifacts and manifest
//!
//! ```no_run
//! use embedgen::{CliArgs, Config, TaskInput, WorkflowEngine};
//!
//! # async fn example() -> Result<(), embedgen::EmbedgenError> {
//! let config = Config::discover(&CliArgs::default())?;
//! let task = TaskInput::load("tasks/blink".as_ref(), &config.input.prompt_file)?;
//! let engine = WorkflowEngine::from_config(&config)?;
//! let run_dir = task.create_run_dir(chrono::Local::now())?;
//! let state = engine.run(task.initial_state(&run_dir)).await?;
//! println!("{:?}", state.status_msg);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod task;

pub use task::TaskInput;

pub use embedgen_config::{CliArgs, Config, ConfigSource};
pub use embedgen_engine::{
    Artifact, ArtifactRole, Manifest, ManifestMismatch, StateUpdate, Target, WorkflowEngine,
    WorkflowGraph, WorkflowState,
};
pub use embedgen_skills::SkillCatalog;
pub use embedgen_utils::{EmbedgenError, ExitCode, UserFriendlyError};
