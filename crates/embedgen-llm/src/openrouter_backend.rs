//! OpenAI-compatible chat-completions backend (OpenRouter by default).

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use async_trait::async_trait;
use embedgen_config::Config;
use embedgen_utils::error::LlmError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_REFERER: &str = "https://github.com/embedgen/embedgen";
const DEFAULT_TITLE: &str = "embedgen";

#[derive(Debug, Clone, Copy)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone)]
pub(crate) struct OpenRouterBackend {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl OpenRouterBackend {
    pub fn new(
        api_key: String,
        api_base: &str,
        default_model: String,
        default_params: HttpParams,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new(max_retries)?,
            endpoint: chat_completions_url(api_base),
            api_key,
            default_model,
            default_params,
        })
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if no API key is available.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "Missing API key. Set {} (or OPENROUTER_API_KEY).",
                config.model.api_key_env
            ))
        })?;

        Self::new(
            api_key,
            &config.model.api_base,
            config.model.name.clone(),
            HttpParams {
                max_tokens: config.model.max_tokens,
                temperature: config.model.temperature,
            },
            config.model.max_retries,
        )
    }

    /// `inv.model` and `inv.metadata` override the backend defaults.
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(self.default_params.max_tokens);

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage<'_>> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &msg.content,
            })
            .collect()
    }
}

fn chat_completions_url(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = "openrouter",
            run_id = %inv.run_id,
            stage = %inv.stage,
            model = %model,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat completions"
        );

        let request_body = ChatRequest {
            model: &model,
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .client()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", DEFAULT_REFERER)
            .header("X-Title", DEFAULT_TITLE)
            .json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "openrouter")
            .await?;

        let response_body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to parse response body: {e}")))?;

        let choice = response_body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Transport("Response missing choices[0]".to_string()))?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("Response missing content in choices[0]".to_string())
        })?;

        let mut result = LlmResult::new(content, "openrouter", model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = "openrouter",
            stage = %inv.stage,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat completion received"
        );

        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend() -> OpenRouterBackend {
        OpenRouterBackend::new(
            "test-key".to_string(),
            "https://openrouter.ai/api/v1/",
            "anthropic/claude-4.5-sonnet".to_string(),
            HttpParams {
                max_tokens: 4096,
                temperature: 0.0,
            },
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            backend().endpoint,
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_resolve_params_prefers_invocation_values() {
        let inv = LlmInvocation::new(
            "run",
            "plan",
            "openai/gpt-4o",
            Duration::from_secs(30),
            vec![Message::user("hi")],
        )
        .with_metadata("temperature", serde_json::json!(0.5))
        .with_metadata("max_tokens", serde_json::json!(128));

        let (model, params) = backend().resolve_params(&inv);

        assert_eq!(model, "openai/gpt-4o");
        assert_eq!(params.max_tokens, 128);
        assert!((params.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolve_params_falls_back_to_defaults() {
        let inv = LlmInvocation::new("run", "plan", "", Duration::from_secs(30), vec![]);

        let (model, params) = backend().resolve_params(&inv);

        assert_eq!(model, "anthropic/claude-4.5-sonnet");
        assert_eq!(params.max_tokens, 4096);
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let messages = vec![Message::system("sys"), Message::user("req")];
        let body = ChatRequest {
            model: "m",
            messages: OpenRouterBackend::convert_messages(&messages),
            max_tokens: 10,
            temperature: 0.0,
            stream: false,
        };

        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "req");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_response_parses_content_and_usage() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"```c\nint x;\n```"}}],
                      "usage":{"prompt_tokens":12,"completion_tokens":5}}"#;

        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("```c\nint x;\n```")
        );
        assert_eq!(parsed.usage.unwrap().completion_tokens, 5);
    }
}
