//! Model gateway for embedgen
//!
//! All model traffic goes through [`ModelGateway`], which owns one
//! [`LlmBackend`] for the lifetime of a run. The production backend speaks the
//! OpenAI-compatible chat-completions protocol (OpenRouter by default).

mod gateway;
pub(crate) mod http_client;
mod openrouter_backend;
pub mod prompts;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use embedgen_utils::error::LlmError;
pub use gateway::{
    GENERATE_STAGE, ModelGateway, PLAN_STAGE, ProjectPlan, is_safe_project_name, parse_plan,
};
pub use http_client::redact_error_message;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
