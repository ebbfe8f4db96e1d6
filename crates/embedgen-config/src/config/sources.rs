use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Env) => "env",
        Some(ConfigSource::Config) => "config",
        Some(ConfigSource::Programmatic) => "programmatic",
        Some(ConfigSource::Default) | None => "default",
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// The API key itself is never included; only the variable name is.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key)).to_string();
            config.insert(key.to_string(), (value, source));
        };

        if let Some(task_dir) = &self.input.task_dir {
            add("input.task_dir", task_dir.display().to_string());
        }
        add("input.prompt_file", self.input.prompt_file.clone());
        add("model.provider", self.model.provider.clone());
        add("model.name", self.model.name.clone());
        add("model.temperature", self.model.temperature.to_string());
        add("model.api_base", self.model.api_base.clone());
        add("model.api_key_env", self.model.api_key_env.clone());
        add("model.max_tokens", self.model.max_tokens.to_string());
        add("model.timeout_secs", self.model.timeout_secs.to_string());
        add("model.max_retries", self.model.max_retries.to_string());
        add("graph.enable_diagram", self.graph.enable_diagram.to_string());
        add("skills.dir", self.skills.dir.display().to_string());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_reports_sources() {
        let config = Config::builder().model_name("x/y").build().unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("model.name"),
            Some(&("x/y".to_string(), "programmatic".to_string()))
        );
        assert_eq!(
            effective.get("graph.enable_diagram"),
            Some(&("false".to_string(), "default".to_string()))
        );
        assert!(!effective.contains_key("input.task_dir"));
    }
}
