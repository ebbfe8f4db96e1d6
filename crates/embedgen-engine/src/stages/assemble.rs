use async_trait::async_trait;
use embedgen_utils::error::StageError;
use tracing::debug;

use super::workspace::resolved_workspace;
use super::{Stage, StageContext, names};
use crate::artifact::{Artifact, ArtifactRole};
use crate::extraction::extract;
use crate::state::{StateUpdate, Target, WorkflowState, WorkspaceInfo};

pub const CMAKE_FILE: &str = "CMakeLists.txt";
pub const MAIN_CMAKE_FILE: &str = "main/CMakeLists.txt";
pub const DIAGRAM_PATH: &str = "wiring/wokwi.json";

const MAIN_COMPONENT_CMAKE: &str = r#"idf_component_register(SRCS "main.c" INCLUDE_DIRS ".")"#;

fn project_cmake(project_name: &str) -> String {
    format!(
        "cmake_minimum_required(VERSION 3.16)\n\
         include($ENV{{IDF_PATH}}/tools/cmake/project.cmake)\n\
         project({project_name})"
    )
}

/// Turn generated text into the artifact list for `workspace`. Pure.
///
/// # Errors
///
/// Returns `StageError::Path` if the workspace yields an invalid artifact
/// path.
pub fn assemble_artifacts(
    workspace: &WorkspaceInfo,
    raw_code: &str,
    diagram: Option<&str>,
) -> Result<Vec<Artifact>, StageError> {
    let extraction = extract(raw_code);
    debug!(strategy = extraction.strategy.name(), "Extracted code");

    let mut artifacts = vec![Artifact::new(
        workspace.source_artifact_path(),
        extraction.code,
        ArtifactRole::Code,
    )?];

    if workspace.target == Target::EspIdf {
        artifacts.push(Artifact::new(
            CMAKE_FILE,
            project_cmake(&workspace.project_name),
            ArtifactRole::Meta,
        )?);
        artifacts.push(Artifact::new(
            MAIN_CMAKE_FILE,
            MAIN_COMPONENT_CMAKE,
            ArtifactRole::Meta,
        )?);
    }

    if let Some(diagram) = diagram.map(str::trim).filter(|d| !d.is_empty()) {
        artifacts.push(Artifact::new(DIAGRAM_PATH, diagram, ArtifactRole::Diagram)?);
    }

    Ok(artifacts)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AssembleArtifactsStage;

#[async_trait]
impl Stage for AssembleArtifactsStage {
    fn name(&self) -> &'static str {
        names::ASSEMBLE_ARTIFACTS
    }

    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        let raw_code = state
            .code_content
            .as_deref()
            .ok_or(StageError::MissingInput {
                field: "code_content",
            })?;
        let workspace = resolved_workspace(state);
        let artifacts =
            assemble_artifacts(&workspace, raw_code, state.diagram_content.as_deref())?;

        Ok(StateUpdate {
            workspace: Some(workspace),
            artifacts: Some(artifacts),
            ..StateUpdate::default()
        })
    }
}
