//! The single model handle a workflow run talks to.

use std::sync::Arc;
use std::time::Duration;

use embedgen_config::Config;
use embedgen_utils::error::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http_client::redact_error_message;
use crate::openrouter_backend::OpenRouterBackend;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

/// Stage names carried on every invocation.
pub const PLAN_STAGE: &str = "plan";
pub const GENERATE_STAGE: &str = "generate_code";

/// Structured planner output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub project_name: String,
    pub selected_skills: Vec<String>,
}

static SAFE_PROJECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]{0,63}$").unwrap());

/// Project names become file names (`<name>.ino`) and a CMake project name.
#[must_use]
pub fn is_safe_project_name(name: &str) -> bool {
    SAFE_PROJECT_NAME.is_match(name)
}

/// Parse a planner response into a [`ProjectPlan`].
///
/// Tolerates prose or a code fence around the JSON object; everything
/// between the first `{` and the last `}` is parsed.
///
/// # Errors
///
/// Returns `LlmError::Parse` when no object is present, the object does not
/// match the schema, or the project name is not filesystem-safe.
pub fn parse_plan(raw: &str) -> Result<ProjectPlan, LlmError> {
    let start = raw
        .find('{')
        .ok_or_else(|| LlmError::Parse("no JSON object in planner output".to_string()))?;
    let end = raw
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| LlmError::Parse("unterminated JSON object in planner output".to_string()))?;

    let mut plan: ProjectPlan = serde_json::from_str(&raw[start..=end])
        .map_err(|e| LlmError::Parse(format!("planner output does not match schema: {e}")))?;

    plan.project_name = plan.project_name.trim().to_string();
    if !is_safe_project_name(&plan.project_name) {
        return Err(LlmError::Parse(format!(
            "project_name '{}' is not a filesystem-safe identifier",
            plan.project_name
        )));
    }

    let mut seen = std::collections::HashSet::new();
    plan.selected_skills = plan
        .selected_skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect();

    Ok(plan)
}

/// Immutable handle to the model endpoint for one run.
///
/// Cloning shares the backend. Reconfiguring means building a new gateway.
#[derive(Clone)]
pub struct ModelGateway {
    backend: Arc<dyn LlmBackend>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ModelGateway {
    #[must_use]
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature,
            timeout,
        }
    }

    /// Build the HTTP-backed gateway described by `config`.
    ///
    /// # Errors
    ///
    /// `LlmError::Unsupported` for an unknown provider and
    /// `LlmError::Misconfiguration` when the API key is missing.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let backend: Arc<dyn LlmBackend> = match config.model.provider.as_str() {
            "openrouter" | "openai" => Arc::new(OpenRouterBackend::new_from_config(config)?),
            unknown => {
                return Err(LlmError::Unsupported(format!(
                    "Unknown LLM provider '{unknown}'. Supported providers: openrouter, openai."
                )));
            }
        };

        Ok(Self::new(
            backend,
            config.model.name.clone(),
            config.model.temperature,
            config.model_timeout(),
        ))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One system + user exchange, bounded by the gateway deadline.
    async fn exchange(
        &self,
        run_id: &str,
        stage: &str,
        system: &str,
        user: &str,
    ) -> Result<LlmResult, LlmError> {
        let inv = LlmInvocation::new(
            run_id,
            stage,
            self.model.clone(),
            self.timeout,
            vec![Message::system(system), Message::user(user)],
        )
        .with_metadata("temperature", serde_json::json!(self.temperature));

        debug!(run_id, stage, model = %self.model, "Calling model");

        match tokio::time::timeout(self.timeout, self.backend.invoke(inv)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!(run_id, stage, error = %redact_error_message(&e.to_string()), "Model call failed");
                Err(e)
            }
            Err(_) => {
                warn!(run_id, stage, timeout_secs = self.timeout.as_secs(), "Model call timed out");
                Err(LlmError::Timeout {
                    duration: self.timeout,
                })
            }
        }
    }

    /// Ask the planner for a project name and skill selection.
    ///
    /// # Errors
    ///
    /// Transport variants when the call fails, `LlmError::Parse` when the
    /// answer is not a valid plan.
    pub async fn plan(
        &self,
        run_id: &str,
        system: &str,
        requirements: &str,
    ) -> Result<ProjectPlan, LlmError> {
        let result = self.exchange(run_id, PLAN_STAGE, system, requirements).await?;
        parse_plan(&result.raw_response)
    }

    /// Ask the coder for the main source file. The raw text is returned
    /// untouched; extraction happens during assembly.
    ///
    /// # Errors
    ///
    /// Any `LlmError` from the backend or the deadline.
    pub async fn generate_code(
        &self,
        run_id: &str,
        system: &str,
        requirements: &str,
    ) -> Result<LlmResult, LlmError> {
        self.exchange(run_id, GENERATE_STAGE, system, requirements)
            .await
    }
}
