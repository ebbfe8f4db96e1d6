use std::time::Instant;

use async_trait::async_trait;
use embedgen_llm::prompts::planner_system_prompt;
use embedgen_utils::error::StageError;
use serde_json::json;
use tracing::{info, warn};

use super::{Stage, StageContext, names};
use crate::state::{LogEntry, StateUpdate, WorkflowState};

/// Node name recorded in `debug.json` for planner calls.
pub const PLAN_NODE: &str = "manager";

pub const FALLBACK_PROJECT_NAME: &str = "esp32_fallback";
pub const FALLBACK_SKILL: &str = "esp-idf";
pub const FALLBACK_SKILL_CONTENT: &str = "Use standard ESP-IDF best practices.";

/// Picks the project name and the skills that apply.
///
/// Never fails: any gateway or parse error is replaced by [`fallback_plan`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanStage;

/// The update used when planning fails. `error` ends up in the log entry.
#[must_use]
pub fn fallback_plan(requirements: &str, error: &str, elapsed: std::time::Duration) -> StateUpdate {
    StateUpdate {
        project_name: Some(FALLBACK_PROJECT_NAME.to_string()),
        active_skills: Some(vec![FALLBACK_SKILL.to_string()]),
        active_skill_content: Some(FALLBACK_SKILL_CONTENT.to_string()),
        ..StateUpdate::default()
    }
    .with_log(
        LogEntry::new(
            PLAN_NODE,
            elapsed,
            json!({ "request": requirements }),
            json!({ "error": error }),
        )
        .with_metadata("status", json!("fallback")),
    )
}

#[async_trait]
impl Stage for PlanStage {
    fn name(&self) -> &'static str {
        names::PLAN
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StateUpdate, StageError> {
        let catalog = ctx.skills.scan_skills();
        let available = ctx.skills.describe();
        let system = planner_system_prompt(&available);

        let started = Instant::now();
        let plan = match ctx
            .gateway
            .plan(&ctx.run_id, &system, &state.requirements)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                warn!(run_id = %ctx.run_id, error = %e, "Planning failed; using fallback plan");
                return Ok(fallback_plan(
                    &state.requirements,
                    &e.to_string(),
                    started.elapsed(),
                ));
            }
        };
        let elapsed = started.elapsed();

        let (known, unknown): (Vec<String>, Vec<String>) = plan
            .selected_skills
            .iter()
            .cloned()
            .partition(|name| catalog.contains_key(name));
        if !unknown.is_empty() {
            warn!(run_id = %ctx.run_id, skills = ?unknown, "Planner selected unknown skills; dropped");
        }

        let content = ctx.skills.load_skills(&known);
        info!(
            run_id = %ctx.run_id,
            project = %plan.project_name,
            skills = ?known,
            "Project planned"
        );

        let entry = LogEntry::new(
            PLAN_NODE,
            elapsed,
            json!({
                "system": system,
                "user": state.requirements,
                "available_skills": available,
            }),
            json!(plan),
        )
        .with_metadata("parser", json!("json"))
        .with_metadata("schema", json!("ProjectPlan"));

        Ok(StateUpdate {
            project_name: Some(plan.project_name),
            active_skills: Some(known),
            active_skill_content: Some(content),
            ..StateUpdate::default()
        }
        .with_log(entry))
    }
}
