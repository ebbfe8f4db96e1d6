use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use embedgen_utils::atomic_write::{write_file_atomic, write_text_atomic};
use embedgen_utils::error::StageError;
use embedgen_utils::paths::{PathGuard, ensure_dir_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::workspace::resolved_workspace;
use super::{Stage, StageContext, names};
use crate::manifest::{Manifest, ManifestEntry, manifest_path};
use crate::state::{StateUpdate, Target, WorkflowState};

pub const DEBUG_LOG_FILE: &str = "debug.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Run summary written to `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub task_name: String,
    pub prompt_file: String,
    pub project_name: String,
    pub active_skills: Vec<String>,
    pub output_type: Target,
    pub timestamp: DateTime<Utc>,
    pub requirements: String,
}

/// Writes artifacts, the manifest and the run-level debug and metadata
/// files. The only stage with durable side effects.
///
/// Artifacts are written one by one through a [`PathGuard`]; the first
/// rejected path aborts the stage before anything is written for it, and no
/// manifest is produced.
#[derive(Debug, Default, Clone, Copy)]
pub struct PersistStage;

#[async_trait]
impl Stage for PersistStage {
    fn name(&self) -> &'static str {
        names::PERSIST
    }

    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        let workspace = resolved_workspace(state);
        let output_root = &workspace.output_root;
        create_dir(output_root)?;

        let guard = PathGuard::new(output_root)?;
        let mut entries = Vec::with_capacity(state.artifacts.len());
        let mut persisted = Vec::with_capacity(state.artifacts.len());

        for artifact in &state.artifacts {
            let target = guard.join(artifact.path())?;
            if let Some(parent) = target.as_path().parent() {
                create_dir(parent)?;
            }
            write_bytes(target.as_path(), artifact.content().as_bytes())?;
            debug!(path = artifact.path(), role = %artifact.role(), "Artifact written");

            entries.push(ManifestEntry::for_artifact(artifact));
            persisted.push(target.to_path_buf());
        }

        let manifest = Manifest {
            project_name: workspace.project_name.clone(),
            target: workspace.target,
            active_skills: state.active_skills.clone(),
            timestamp: Utc::now(),
            artifacts: entries,
        };
        let manifest_file = manifest_path(output_root);
        let manifest_json = manifest.to_json().map_err(|e| StageError::Serialization {
            what: "manifest",
            reason: e.to_string(),
        })?;
        write_text(&manifest_file, &manifest_json)?;

        let debug_json =
            serde_json::to_string_pretty(&state.debug_logs).map_err(|e| {
                StageError::Serialization {
                    what: "debug logs",
                    reason: e.to_string(),
                }
            })?;
        write_text(&state.run_dir.join(DEBUG_LOG_FILE), &debug_json)?;

        let metadata = RunMetadata {
            task_name: state.task_name.clone(),
            prompt_file: state.prompt_file.clone(),
            project_name: workspace.project_name.clone(),
            active_skills: state.active_skills.clone(),
            output_type: workspace.target,
            timestamp: Utc::now(),
            requirements: state.requirements.clone(),
        };
        let metadata_json =
            serde_json::to_string_pretty(&metadata).map_err(|e| StageError::Serialization {
                what: "run metadata",
                reason: e.to_string(),
            })?;
        write_text(&state.run_dir.join(METADATA_FILE), &metadata_json)?;

        info!(
            artifacts = persisted.len(),
            manifest = %manifest_file.display(),
            "Artifacts persisted"
        );

        Ok(StateUpdate {
            status_msg: Some(format!("Project generated at {}", state.run_dir.display())),
            manifest_path: Some(manifest_file),
            persisted_paths: Some(persisted),
            ..StateUpdate::default()
        })
    }
}

fn create_dir(path: &Path) -> Result<(), StageError> {
    ensure_dir_all(path).map_err(|source| StageError::Io {
        action: "create directory",
        path: path.to_path_buf(),
        source,
    })
}

fn write_bytes(path: &Path, content: &[u8]) -> Result<u64, StageError> {
    write_file_atomic(path, content).map_err(|e| write_error(path, &e))
}

fn write_text(path: &Path, content: &str) -> Result<u64, StageError> {
    write_text_atomic(path, content).map_err(|e| write_error(path, &e))
}

fn write_error(path: &Path, e: &anyhow::Error) -> StageError {
    StageError::Write {
        path: PathBuf::from(path),
        reason: format!("{e:#}"),
    }
}
