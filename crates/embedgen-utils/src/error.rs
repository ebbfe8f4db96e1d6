use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::paths::PathError;

/// Library-level error type with context and user-friendly reporting.
///
/// `EmbedgenError` is what the CLI surfaces. Library code returns it (or one
/// of the narrower enums below) and never calls `std::process::exit()`.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration / CLI argument / task input errors |
/// | 3 | Artifact path validation failures |
/// | 70 | Model gateway failures |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum EmbedgenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Path validation error: {0}")]
    Path(#[from] PathError),

    #[error("Invalid task directory {path}: {reason}")]
    InvalidTask { path: PathBuf, reason: String },

    #[error("Run {path} does not match its manifest: {mismatches} artifact(s) differ")]
    Verification { path: PathBuf, mismatches: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// User-facing rendering of an error.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    StageExecution,
    ModelGateway,
    FileSystem,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::StageExecution => write!(f, "Stage Execution"),
            Self::ModelGateway => write!(f, "Model Gateway"),
            Self::FileSystem => write!(f, "File System"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [input], [model], [graph] and [skills] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => {
                Some("The model gateway cannot be built without this value.".to_string())
            }
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "embedgen searches for .embedgen/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Remove unknown keys; the configuration schema is strict".to_string(),
            ],
            Self::MissingRequired(key) => vec![
                format!("Set '{key}' in .embedgen/config.toml"),
                "Or pass the equivalent command-line flag".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "model.temperature" => {
                    vec!["Use a temperature between 0.0 and 2.0".to_string()]
                }
                "model.timeout_secs" => {
                    vec!["Use a timeout between 5 and 3600 seconds".to_string()]
                }
                "model.max_retries" => vec!["Use at most 5 retries".to_string()],
                _ => vec![format!("Check the documented format for '{key}'")],
            },
            Self::NotFound { path } => vec![
                format!("Create the file at {path}"),
                "Or omit --config to use discovery and defaults".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check directory permissions".to_string(),
                "Use --config to point at an explicit file".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

// ============================================================================
// Model gateway
// ============================================================================

/// Errors that can occur during LLM backend operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed envelope)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// The model answered but the answer does not have the requested shape
    #[error("Unparsable model output: {0}")]
    Parse(String),

    /// Missing API key, blank model name, bad endpoint
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {duration:?}")
            }
            Self::Parse(msg) => format!("LLM output could not be parsed: {msg}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => Some(
                "The API key is read from the environment variable named by model.api_key_env."
                    .to_string(),
            ),
            Self::Timeout { .. } => {
                Some("Each model call is bounded by model.timeout_secs.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => vec![
                "Export OPENAI_API_KEY (or OPENROUTER_API_KEY) before running".to_string(),
                "Check model.api_base points at an OpenAI-compatible endpoint".to_string(),
            ],
            Self::ProviderQuota(_) => vec!["Wait and retry later".to_string()],
            Self::ProviderOutage(_) | Self::Transport(_) => {
                vec!["Check network connectivity and retry".to_string()]
            }
            Self::Timeout { .. } => vec!["Increase model.timeout_secs".to_string()],
            Self::Parse(_) => vec!["Try a different model with --model".to_string()],
            Self::Unsupported(_) => vec!["Set model.provider = \"openrouter\"".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::ModelGateway,
        }
    }
}

// ============================================================================
// Stage and workflow
// ============================================================================

/// Failure inside a single stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Required state field '{field}' is not set")]
    MissingInput { field: &'static str },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Serialization failed for {what}: {reason}")]
    Serialization { what: &'static str, reason: String },
}

/// Failure of the workflow as a whole.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("Stages {stages:?} wrote the same field '{field}' in one layer")]
    ConflictingWrite { field: String, stages: Vec<String> },

    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(String),
}

impl WorkflowError {
    /// Name of the failing stage, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        match self {
            Self::StageFailed { stage, source } => match source {
                StageError::Llm(e) => format!("Stage '{stage}' failed: {}", e.user_message()),
                other => format!("Stage '{stage}' failed: {other}"),
            },
            Self::ConflictingWrite { field, stages } => format!(
                "Stages {} both wrote '{field}'",
                stages.join(" and ")
            ),
            Self::InvalidGraph(reason) => format!("Workflow graph is invalid: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::StageFailed {
                source: StageError::Path(_),
                ..
            } => Some(
                "Artifacts written before the rejected path remain on disk; no manifest was written."
                    .to_string(),
            ),
            Self::StageFailed {
                source: StageError::Llm(e),
                ..
            } => e.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::StageFailed {
                source: StageError::Llm(e),
                ..
            } => e.suggestions(),
            Self::StageFailed {
                source: StageError::Io { .. } | StageError::Write { .. },
                ..
            } => vec!["Check permissions and free space in the run directory".to_string()],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::StageFailed {
                source: StageError::Llm(e),
                ..
            } => e.category(),
            Self::StageFailed {
                source: StageError::Path(_),
                ..
            } => ErrorCategory::Validation,
            Self::StageFailed {
                source: StageError::Io { .. } | StageError::Write { .. },
                ..
            } => ErrorCategory::FileSystem,
            _ => ErrorCategory::StageExecution,
        }
    }
}

impl UserFriendlyError for EmbedgenError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Workflow(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Path(e) => format!("Unsafe artifact path: {e}"),
            Self::InvalidTask { path, reason } => {
                format!("Task directory {} is not usable: {reason}", path.display())
            }
            Self::Verification { path, mismatches } => format!(
                "{mismatches} artifact(s) under {} differ from the recorded manifest",
                path.display()
            ),
            Self::Io(e) => format!("File system error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Workflow(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::InvalidTask { .. } => Some(
                "A task directory holds the prompt file; each run is written to <task>/runs/<timestamp>."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Workflow(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::InvalidTask { .. } => vec![
                "Pass an existing directory as TASK_DIR".to_string(),
                "Use --prompt-file if the prompt is not named prompt.txt".to_string(),
            ],
            Self::Verification { .. } => {
                vec!["Re-run the task to regenerate the project".to_string()]
            }
            Self::Path(_) | Self::Io(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Workflow(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Path(_) => ErrorCategory::Validation,
            Self::InvalidTask { .. } => ErrorCategory::Configuration,
            Self::Verification { .. } | Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl EmbedgenError {
    /// Error message with context and suggestions, ready for stderr.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            EmbedgenError::Config(_) | EmbedgenError::InvalidTask { .. } => ExitCode::CLI_ARGS,
            EmbedgenError::Path(_) => ExitCode::PATH_VIOLATION,
            EmbedgenError::Llm(LlmError::Misconfiguration(_)) => ExitCode::CLI_ARGS,
            EmbedgenError::Llm(_) => ExitCode::LLM_FAILURE,
            EmbedgenError::Workflow(WorkflowError::StageFailed { source, .. }) => match source {
                StageError::Llm(_) => ExitCode::LLM_FAILURE,
                StageError::Path(_) => ExitCode::PATH_VIOLATION,
                _ => ExitCode::INTERNAL,
            },
            EmbedgenError::Workflow(_)
            | EmbedgenError::Verification { .. }
            | EmbedgenError::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_stage_failure_reports_stage_name() {
        let err = WorkflowError::StageFailed {
            stage: "generate_code".to_string(),
            source: StageError::Llm(LlmError::Transport("connection reset".to_string())),
        };

        assert_eq!(err.stage(), Some("generate_code"));
        assert!(err.user_message().contains("generate_code"));
        assert_eq!(err.category(), ErrorCategory::ModelGateway);
    }

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let llm = EmbedgenError::Workflow(WorkflowError::StageFailed {
            stage: "generate_code".to_string(),
            source: StageError::Llm(LlmError::Timeout {
                duration: Duration::from_secs(5),
            }),
        });
        assert_eq!(llm.to_exit_code(), ExitCode::LLM_FAILURE);

        let path = EmbedgenError::Workflow(WorkflowError::StageFailed {
            stage: "persist".to_string(),
            source: StageError::Path(PathError::Empty),
        });
        assert_eq!(path.to_exit_code(), ExitCode::PATH_VIOLATION);

        let config = EmbedgenError::Config(ConfigError::MissingRequired("model.name".into()));
        assert_eq!(config.to_exit_code(), ExitCode::CLI_ARGS);

        let key = EmbedgenError::Llm(LlmError::Misconfiguration("no key".into()));
        assert_eq!(key.to_exit_code(), ExitCode::CLI_ARGS);
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = EmbedgenError::Config(ConfigError::InvalidValue {
            key: "model.temperature".to_string(),
            value: "9.0".to_string(),
        });
        let rendered = err.display_for_user();

        assert!(rendered.starts_with("Error: "));
        assert!(rendered.contains("Suggestions:"));
        assert!(rendered.contains("between 0.0 and 2.0"));
    }
}
