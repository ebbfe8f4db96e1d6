//! Workflow stages.
//!
//! A stage reads the committed [`WorkflowState`] snapshot and returns a
//! [`StateUpdate`]; it never mutates shared state itself. The engine merges
//! updates at layer boundaries.

mod assemble;
mod coder;
mod diagram;
mod persist;
mod plan;
mod workspace;

use std::sync::Arc;

use async_trait::async_trait;
use embedgen_llm::ModelGateway;
use embedgen_skills::SkillCatalog;
use embedgen_utils::error::StageError;

use crate::state::{StateUpdate, WorkflowState};

pub use assemble::{
    AssembleArtifactsStage, CMAKE_FILE, DIAGRAM_PATH, MAIN_CMAKE_FILE, assemble_artifacts,
};
pub use coder::{CODER_NODE, GenerateCodeStage};
pub use diagram::DiagramStage;
pub use persist::{DEBUG_LOG_FILE, METADATA_FILE, PersistStage, RunMetadata};
pub use plan::{
    FALLBACK_PROJECT_NAME, FALLBACK_SKILL, FALLBACK_SKILL_CONTENT, PLAN_NODE, PlanStage,
    fallback_plan,
};
pub use workspace::{PrepareWorkspaceStage, repair_workspace, resolved_workspace};

/// Stage names, as used for graph edges, spans and error reports.
pub mod names {
    pub const PLAN: &str = "plan";
    pub const PREPARE_WORKSPACE: &str = "prepare_workspace";
    pub const GENERATE_CODE: &str = "generate_code";
    pub const DIAGRAM: &str = "diagram";
    pub const ASSEMBLE_ARTIFACTS: &str = "assemble_artifacts";
    pub const PERSIST: &str = "persist";
}

/// Collaborators a stage may use. Built once per run.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: String,
    pub gateway: ModelGateway,
    pub skills: Arc<SkillCatalog>,
}

#[async_trait]
pub trait Stage: Send + Sync {
    /// Unique name within a workflow graph.
    fn name(&self) -> &'static str;

    /// Compute this stage's update from the committed state.
    async fn run(&self, state: &WorkflowState, ctx: &StageContext)
    -> Result<StateUpdate, StageError>;
}
