use embedgen_utils::error::ConfigError;

use super::Config;

const SUPPORTED_PROVIDERS: &[&str] = &["openrouter", "openai"];

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("model.name", &self.model.name),
            ("model.api_base", &self.model.api_base),
            ("model.api_key_env", &self.model.api_key_env),
            ("input.prompt_file", &self.input.prompt_file),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(key, "must be a non-empty string"));
            }
        }

        if !SUPPORTED_PROVIDERS.contains(&self.model.provider.as_str()) {
            return Err(invalid(
                "model.provider",
                format!(
                    "unknown provider '{}'; expected one of {}",
                    self.model.provider,
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            ));
        }

        if !self.model.api_base.starts_with("http://") && !self.model.api_base.starts_with("https://")
        {
            return Err(invalid("model.api_base", "must be an http(s) URL"));
        }

        let temperature = self.model.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(invalid(
                "model.temperature",
                format!("{temperature} is outside 0.0..=2.0"),
            ));
        }

        if self.model.timeout_secs < 5 {
            return Err(invalid("model.timeout_secs", "must be at least 5 seconds"));
        }
        if self.model.timeout_secs > 3600 {
            return Err(invalid(
                "model.timeout_secs",
                "exceeds maximum limit of 3600 seconds (1 hour)",
            ));
        }

        if self.model.max_retries > 5 {
            return Err(invalid("model.max_retries", "exceeds maximum of 5"));
        }

        if self.model.max_tokens == 0 {
            return Err(invalid("model.max_tokens", "must be greater than 0"));
        }

        // The prompt file is joined onto the task directory.
        let prompt = std::path::Path::new(&self.input.prompt_file);
        if prompt.is_absolute()
            || prompt
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(invalid(
                "input.prompt_file",
                "must be a file name relative to the task directory",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_validate() {
        assert!(Config::builder().build().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            (Config::builder().temperature(2.5).build(), "model.temperature"),
            (Config::builder().timeout_secs(1).build(), "model.timeout_secs"),
            (Config::builder().max_retries(9).build(), "model.max_retries"),
            (Config::builder().model_name("  ").build(), "model.name"),
            (Config::builder().api_base("ftp://x").build(), "model.api_base"),
            (Config::builder().provider("bedrock").build(), "model.provider"),
            (
                Config::builder().prompt_file("../secret.txt").build(),
                "input.prompt_file",
            ),
        ];

        for (result, expected_key) in cases {
            match result {
                Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
                other => panic!("expected InvalidValue for {expected_key}, got {other:?}"),
            }
        }
    }
}
