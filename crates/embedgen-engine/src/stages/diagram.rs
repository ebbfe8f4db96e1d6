use async_trait::async_trait;
use embedgen_utils::error::StageError;

use super::{Stage, StageContext, names};
use crate::state::{StateUpdate, WorkflowState};

/// Wiring-diagram branch. Produces no diagram yet; an empty
/// `diagram_content` means assembly adds no diagram artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagramStage;

#[async_trait]
impl Stage for DiagramStage {
    fn name(&self) -> &'static str {
        names::DIAGRAM
    }

    async fn run(
        &self,
        _state: &WorkflowState,
        _ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        Ok(StateUpdate {
            diagram_content: Some(String::new()),
            ..StateUpdate::default()
        })
    }
}
