mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;

use std::time::Duration;

impl Config {
    /// Per-call deadline for model requests.
    #[must_use]
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }

    /// Resolve the API key from the configured environment variable, falling
    /// back to `OPENROUTER_API_KEY`. Blank values count as missing.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        [self.model.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}
