use std::time::Instant;

use async_trait::async_trait;
use embedgen_llm::Message;
use embedgen_llm::prompts::{NO_STANDARDS, coder_system_prompt};
use embedgen_utils::error::StageError;
use serde_json::json;
use tracing::info;

use super::{Stage, StageContext, names};
use crate::state::{LogEntry, StateUpdate, WorkflowState};

/// Node name recorded in `debug.json` for coder calls.
pub const CODER_NODE: &str = "coder";

/// Asks the model for the main source file. Failures abort the run.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerateCodeStage;

#[async_trait]
impl Stage for GenerateCodeStage {
    fn name(&self) -> &'static str {
        names::GENERATE_CODE
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        let project_name = state
            .project_name
            .as_deref()
            .ok_or(StageError::MissingInput {
                field: "project_name",
            })?;
        let standards = state.active_skill_content.as_deref().unwrap_or(NO_STANDARDS);

        let system = coder_system_prompt(project_name, standards);

        let started = Instant::now();
        let result = ctx
            .gateway
            .generate_code(&ctx.run_id, &system, &state.requirements)
            .await?;
        let elapsed = started.elapsed();

        info!(
            run_id = %ctx.run_id,
            model = %result.model_used,
            chars = result.raw_response.len(),
            "Code generated"
        );

        let entry = LogEntry::new(
            CODER_NODE,
            elapsed,
            json!({
                "system": system,
                "user": state.requirements,
            }),
            json!(result.raw_response),
        )
        .with_metadata("project_name", json!(project_name))
        .with_metadata("active_skills", json!(state.active_skills))
        .with_metadata("model", json!(result.model_used));

        Ok(StateUpdate {
            messages: vec![Message::assistant(result.raw_response.clone())],
            code_content: Some(result.raw_response),
            ..StateUpdate::default()
        }
        .with_log(entry))
    }
}
