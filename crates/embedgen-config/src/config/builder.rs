use std::collections::HashMap;
use std::path::PathBuf;

use embedgen_utils::error::ConfigError;

use super::{Config, ConfigSource, GraphConfig, InputConfig, ModelConfig, SkillsConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// The builder never reads the environment or the filesystem, which makes
    /// it the right entry point for tests and embedding.
    ///
    /// ```rust
    /// use embedgen_config::Config;
    ///
    /// let config = Config::builder()
    ///     .model_name("openai/gpt-4o-mini")
    ///     .enable_diagram(true)
    ///     .build()
    ///     .expect("valid config");
    /// assert!(config.graph.enable_diagram);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder for [`Config`].
///
/// Values set here are attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    task_dir: Option<PathBuf>,
    prompt_file: Option<String>,
    provider: Option<String>,
    model_name: Option<String>,
    temperature: Option<f32>,
    api_base: Option<String>,
    api_key_env: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    enable_diagram: Option<bool>,
    skills_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn task_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.task_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn prompt_file(mut self, name: impl Into<String>) -> Self {
        self.prompt_file = Some(name.into());
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn enable_diagram(mut self, enable: bool) -> Self {
        self.enable_diagram = Some(enable);
        self
    }

    #[must_use]
    pub fn skills_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skills_dir = Some(dir.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut mark = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        mark("input.prompt_file", self.prompt_file.is_some());
        mark("model.provider", self.provider.is_some());
        mark("model.name", self.model_name.is_some());
        mark("model.temperature", self.temperature.is_some());
        mark("model.api_base", self.api_base.is_some());
        mark("model.api_key_env", self.api_key_env.is_some());
        mark("model.max_tokens", self.max_tokens.is_some());
        mark("model.timeout_secs", self.timeout_secs.is_some());
        mark("model.max_retries", self.max_retries.is_some());
        mark("graph.enable_diagram", self.enable_diagram.is_some());
        mark("skills.dir", self.skills_dir.is_some());
        if self.task_dir.is_some() {
            mark("input.task_dir", true);
        }

        let defaults = ModelConfig::default();
        let config = Config {
            input: InputConfig {
                task_dir: self.task_dir,
                prompt_file: self
                    .prompt_file
                    .unwrap_or_else(|| InputConfig::default().prompt_file),
            },
            model: ModelConfig {
                provider: self.provider.unwrap_or(defaults.provider),
                name: self.model_name.unwrap_or(defaults.name),
                temperature: self.temperature.unwrap_or(defaults.temperature),
                api_base: self.api_base.unwrap_or(defaults.api_base),
                api_key_env: self.api_key_env.unwrap_or(defaults.api_key_env),
                max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
                timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
                max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            },
            graph: GraphConfig {
                enable_diagram: self.enable_diagram.unwrap_or(false),
            },
            skills: SkillsConfig {
                dir: self.skills_dir.unwrap_or_else(|| SkillsConfig::default().dir),
            },
            source_attribution,
        };

        config.validate()?;
        Ok(config)
    }
}
