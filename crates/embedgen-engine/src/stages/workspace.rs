use async_trait::async_trait;
use embedgen_utils::error::StageError;
use embedgen_utils::paths::ensure_dir_all;
use tracing::{debug, warn};

use super::{Stage, StageContext, names};
use crate::state::{StateUpdate, Target, WorkflowState, WorkspaceInfo};

/// Project name used when a snapshot carries none.
const UNNAMED_PROJECT: &str = "embedded_project";

/// Decides the target and creates the output directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrepareWorkspaceStage;

#[async_trait]
impl Stage for PrepareWorkspaceStage {
    fn name(&self) -> &'static str {
        names::PREPARE_WORKSPACE
    }

    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        let project_name = state
            .project_name
            .as_deref()
            .ok_or(StageError::MissingInput {
                field: "project_name",
            })?;

        let workspace = WorkspaceInfo::derive(&state.run_dir, project_name, &state.active_skills);

        create_dir(&workspace.output_root)?;
        if workspace.target == Target::EspIdf {
            create_dir(&workspace.output_root.join("main"))?;
        }

        debug!(
            output_root = %workspace.output_root.display(),
            target = %workspace.target,
            "Workspace prepared"
        );

        Ok(StateUpdate {
            workspace: Some(workspace),
            ..StateUpdate::default()
        })
    }
}

fn create_dir(path: &std::path::Path) -> Result<(), StageError> {
    ensure_dir_all(path).map_err(|source| StageError::Io {
        action: "create directory",
        path: path.to_path_buf(),
        source,
    })
}

/// Rebuild `workspace` for a snapshot that lacks it, using the same rules as
/// [`PrepareWorkspaceStage`]. Creates nothing.
#[must_use]
pub fn repair_workspace(state: &WorkflowState) -> WorkspaceInfo {
    let project_name = state.project_name.as_deref().unwrap_or(UNNAMED_PROJECT);
    WorkspaceInfo::derive(&state.run_dir, project_name, &state.active_skills)
}

/// The committed workspace, or a repaired one for partial snapshots.
#[must_use]
pub fn resolved_workspace(state: &WorkflowState) -> WorkspaceInfo {
    match &state.workspace {
        Some(workspace) => workspace.clone(),
        None => {
            warn!(run_dir = %state.run_dir.display(), "State has no workspace; repairing");
            repair_workspace(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_repair_matches_prepare_rules() {
        let mut state = WorkflowState::new("r", "t", "p", "/runs/x");
        state.project_name = Some("blink".to_string());
        state.active_skills = vec!["arduino".to_string()];

        let ws = repair_workspace(&state);
        assert_eq!(ws.target, Target::Arduino);
        assert_eq!(ws.output_root, Path::new("/runs/x/output"));
        assert_eq!(ws.source_artifact_path(), "blink.ino");
    }

    #[test]
    fn test_repair_without_project_name() {
        let state = WorkflowState::new("r", "t", "p", "/runs/x");
        let ws = repair_workspace(&state);
        assert_eq!(ws.project_name, UNNAMED_PROJECT);
        assert_eq!(ws.target, Target::EspIdf);
    }

    #[test]
    fn test_resolved_prefers_committed_workspace() {
        let mut state = WorkflowState::new("r", "t", "p", "/runs/x");
        state.active_skills = vec!["arduino".to_string()];
        let committed = WorkspaceInfo::derive(Path::new("/elsewhere"), "kept", &[]);
        state.workspace = Some(committed.clone());

        assert_eq!(resolved_workspace(&state), committed);
    }
}
