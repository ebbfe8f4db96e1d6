//! Command implementations

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use embedgen_engine::stages::{DEBUG_LOG_FILE, METADATA_FILE, names};
use embedgen_engine::state::OUTPUT_DIR;
use embedgen_engine::{Manifest, StateUpdate, WorkflowEngine};
use embedgen_skills::SkillCatalog;
use embedgen_utils::error::ConfigError;
use tracing::{debug, info, warn};

use crate::task::TaskInput;
use crate::{Config, EmbedgenError};

/// Execute `embedgen run`.
pub(crate) async fn execute_run(config: &Config) -> Result<(), EmbedgenError> {
    let task_dir = config.input.task_dir.clone().ok_or_else(|| {
        ConfigError::MissingRequired("task directory (pass TASK_DIR or set input.task_dir)".into())
    })?;
    let task = TaskInput::load(&task_dir, &config.input.prompt_file)?;

    // Build the gateway first so a missing API key leaves no empty run dir.
    let engine = WorkflowEngine::from_config(config)?;
    debug!(layers = ?engine.workflow().layer_names(), "Workflow compiled");
    let run_dir = task.create_run_dir(Local::now())?;

    println!("Task: {}", task.name);
    println!("Run directory: {}", run_dir.display());
    println!("Requirements:\n{}\n", task.requirements);
    println!("Starting embedded code generation...\n");

    let mut progress = ProgressPrinter::new(io::stdout());
    let state = engine
        .run_with(task.initial_state(&run_dir), |stage, update| {
            if let Err(e) = progress.stage(stage, update) {
                warn!(error = %e, "Failed to print progress");
            }
        })
        .await?;

    info!(
        run_id = %state.run_id(),
        artifacts = state.artifacts.len(),
        "Run finished"
    );

    println!("\nDebug logs saved to: {}", run_dir.join(DEBUG_LOG_FILE).display());
    println!("Metadata saved to: {}", run_dir.join(METADATA_FILE).display());
    if let Some(manifest) = &state.manifest_path {
        println!("Manifest saved to: {}", manifest.display());
    }

    Ok(())
}

/// Execute `embedgen skills`.
pub(crate) fn execute_skills(config: &Config) -> Result<(), EmbedgenError> {
    let catalog = SkillCatalog::new(config.skills.dir.clone());
    let skills = catalog.scan_skills();

    if skills.is_empty() {
        println!("No skills found in {}", config.skills.dir.display());
        return Ok(());
    }

    println!("Skills in {}:", config.skills.dir.display());
    for (name, description) in &skills {
        println!("  {name}: {description}");
    }
    Ok(())
}

/// Execute `embedgen config`.
pub(crate) fn execute_config(config: &Config) {
    println!("Effective configuration:");
    for (key, (value, source)) in config.effective_config() {
        println!("  {key} = {value}  [{source}]");
    }
}

/// Check every artifact of a finished run against its manifest.
///
/// Returns the number of verified artifacts.
///
/// # Errors
///
/// `EmbedgenError::InvalidTask` when the manifest cannot be loaded and
/// `EmbedgenError::Verification` when any artifact differs.
pub fn execute_verify(run_dir: &Path) -> Result<usize, EmbedgenError> {
    let output_root = run_dir.join(OUTPUT_DIR);
    let manifest = Manifest::load(&output_root).map_err(|e| EmbedgenError::InvalidTask {
        path: run_dir.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    let mismatches = manifest.verify(&output_root);
    if mismatches.is_empty() {
        println!(
            "✓ {} artifact(s) match the manifest for {}",
            manifest.artifacts.len(),
            manifest.project_name
        );
        return Ok(manifest.artifacts.len());
    }

    for mismatch in &mismatches {
        eprintln!("  ✗ {mismatch}");
    }
    Err(EmbedgenError::Verification {
        path: PathBuf::from(run_dir),
        mismatches: mismatches.len(),
    })
}

/// Prints one block per completed stage.
#[derive(Debug)]
pub struct ProgressPrinter<W> {
    out: W,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Print the header for `stage` and the fields a reader cares about.
    ///
    /// # Errors
    ///
    /// Propagates write errors from the underlying writer.
    pub fn stage(&mut self, stage: &str, update: &StateUpdate) -> io::Result<()> {
        writeln!(self.out, "--- Stage: {stage} ---")?;
        match stage {
            names::PLAN => {
                if let Some(project) = &update.project_name {
                    writeln!(self.out, "  Project: {project}")?;
                }
                if let Some(skills) = &update.active_skills {
                    writeln!(self.out, "  Skills: {}", skills.join(", "))?;
                }
            }
            names::ASSEMBLE_ARTIFACTS => {
                if let Some(artifacts) = &update.artifacts {
                    for artifact in artifacts {
                        writeln!(self.out, "  {} ({})", artifact.path(), artifact.role())?;
                    }
                }
            }
            names::PERSIST => {
                if let Some(status) = &update.status_msg {
                    writeln!(self.out, "  {status}")?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
