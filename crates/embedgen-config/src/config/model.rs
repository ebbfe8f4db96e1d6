use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_MODEL_NAME: &str = "anthropic/claude-4.5-sonnet";
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const API_BASE_ENV: &str = "OPENAI_BASE_URL";
pub const DEFAULT_PROMPT_FILE: &str = "prompt.txt";
pub const DEFAULT_SKILLS_DIR: &str = "skills";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Resolved configuration for one embedgen invocation.
///
/// Built by [`Config::discover`] (CLI semantics) or [`Config::builder`]
/// (programmatic). Every field is populated; optionality only exists in the
/// on-disk representation.
///
/// # Configuration File Format
///
/// ```toml
/// [input]
/// task_dir = "tasks/dht11_sensor"
/// prompt_file = "prompt.txt"
///
/// [model]
/// name = "anthropic/claude-4.5-sonnet"
/// temperature = 0.0
///
/// [graph]
/// enable_diagram = false
///
/// [skills]
/// dir = "skills"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub input: InputConfig,
    pub model: ModelConfig,
    pub graph: GraphConfig,
    pub skills: SkillsConfig,
    /// Where each setting came from, keyed by dotted name (`model.name`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    /// Task directory used when none is given on the command line.
    pub task_dir: Option<PathBuf>,
    pub prompt_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            task_dir: None,
            prompt_file: DEFAULT_PROMPT_FILE.to_string(),
        }
    }
}

/// Model gateway settings. Only OpenAI-compatible HTTP providers exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: String,
    pub name: String,
    pub temperature: f32,
    pub api_base: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Transport-level retries for 5xx and network failures.
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            name: DEFAULT_MODEL_NAME.to_string(),
            temperature: 0.0,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Run the Diagram stage alongside code generation.
    pub enable_diagram: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillsConfig {
    pub dir: PathBuf,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SKILLS_DIR),
        }
    }
}

/// Source of a configuration value, highest precedence first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Env,
    Config,
    Programmatic,
    Default,
}

// On-disk shape: every field optional so file values can be layered over
// defaults and attributed.

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub input: Option<TomlInput>,
    pub model: Option<TomlModel>,
    pub graph: Option<TomlGraph>,
    pub skills: Option<TomlSkills>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlInput {
    pub task_dir: Option<PathBuf>,
    pub prompt_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlModel {
    pub provider: Option<String>,
    pub name: Option<String>,
    pub temperature: Option<f32>,
    pub api_base: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlGraph {
    pub enable_diagram: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlSkills {
    pub dir: Option<PathBuf>,
}
