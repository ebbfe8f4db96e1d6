use std::collections::HashMap;
use std::path::{Path, PathBuf};

use embedgen_utils::error::ConfigError;

use super::model::{API_BASE_ENV, TomlConfig};
use super::{CliArgs, Config, ConfigSource, GraphConfig, InputConfig, ModelConfig, SkillsConfig};

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot determine current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        Self::discover_with_env(start_dir, cli_args, |key| std::env::var(key).ok())
    }

    /// Path- and environment-driven variant; tests pass a closure instead of
    /// mutating process-global environment.
    pub fn discover_with_env(
        start_dir: &Path,
        cli_args: &CliArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();

        let mut input = InputConfig::default();
        let mut model = ModelConfig::default();
        let mut graph = GraphConfig::default();
        let mut skills = SkillsConfig::default();

        for key in [
            "input.prompt_file",
            "model.provider",
            "model.name",
            "model.temperature",
            "model.api_base",
            "model.api_key_env",
            "model.max_tokens",
            "model.timeout_secs",
            "model.max_retries",
            "graph.enable_diagram",
            "skills.dir",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let base_dir = path
                .parent()
                .and_then(Path::parent)
                .unwrap_or_else(|| Path::new("."));
            let mut set = |key: &str| {
                source_attribution.insert(key.to_string(), ConfigSource::Config);
            };

            if let Some(file_input) = file_config.input {
                if let Some(task_dir) = file_input.task_dir {
                    input.task_dir = Some(resolve_against(base_dir, task_dir));
                    set("input.task_dir");
                }
                if let Some(prompt_file) = file_input.prompt_file {
                    input.prompt_file = prompt_file;
                    set("input.prompt_file");
                }
            }

            if let Some(file_model) = file_config.model {
                if let Some(v) = file_model.provider {
                    model.provider = v;
                    set("model.provider");
                }
                if let Some(v) = file_model.name {
                    model.name = v;
                    set("model.name");
                }
                if let Some(v) = file_model.temperature {
                    model.temperature = v;
                    set("model.temperature");
                }
                if let Some(v) = file_model.api_base {
                    model.api_base = v;
                    set("model.api_base");
                }
                if let Some(v) = file_model.api_key_env {
                    model.api_key_env = v;
                    set("model.api_key_env");
                }
                if let Some(v) = file_model.max_tokens {
                    model.max_tokens = v;
                    set("model.max_tokens");
                }
                if let Some(v) = file_model.timeout_secs {
                    model.timeout_secs = v;
                    set("model.timeout_secs");
                }
                if let Some(v) = file_model.max_retries {
                    model.max_retries = v;
                    set("model.max_retries");
                }
            }

            if let Some(file_graph) = file_config.graph
                && let Some(v) = file_graph.enable_diagram
            {
                graph.enable_diagram = v;
                set("graph.enable_diagram");
            }

            if let Some(file_skills) = file_config.skills
                && let Some(dir) = file_skills.dir
            {
                skills.dir = resolve_against(base_dir, dir);
                set("skills.dir");
            }
        }

        // Environment only supplies the endpoint, and only when the file is silent.
        if source_attribution.get("model.api_base") == Some(&ConfigSource::Default)
            && let Some(base) = env(API_BASE_ENV).filter(|v| !v.trim().is_empty())
        {
            model.api_base = base;
            source_attribution.insert("model.api_base".to_string(), ConfigSource::Env);
        }

        if let Some(task_dir) = &cli_args.task_dir {
            input.task_dir = Some(task_dir.clone());
            source_attribution.insert("input.task_dir".to_string(), ConfigSource::Cli);
        }
        if let Some(prompt_file) = &cli_args.prompt_file {
            input.prompt_file = prompt_file.clone();
            source_attribution.insert("input.prompt_file".to_string(), ConfigSource::Cli);
        }
        if let Some(name) = &cli_args.model {
            model.name = name.clone();
            source_attribution.insert("model.name".to_string(), ConfigSource::Cli);
        }
        if let Some(temperature) = cli_args.temperature {
            model.temperature = temperature;
            source_attribution.insert("model.temperature".to_string(), ConfigSource::Cli);
        }
        if let Some(dir) = &cli_args.skills_dir {
            skills.dir = dir.clone();
            source_attribution.insert("skills.dir".to_string(), ConfigSource::Cli);
        }
        if let Some(enable) = cli_args.enable_diagram {
            graph.enable_diagram = enable;
            source_attribution.insert("graph.enable_diagram".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            input,
            model,
            graph,
            skills,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.embedgen/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".embedgen").join("config.toml");
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            if !current_dir.pop() {
                return None;
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("cannot read {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }
}

/// Relative paths in a config file are relative to the directory that holds
/// `.embedgen/`, not to the process working directory.
fn resolve_against(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(".embedgen");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.model.name, "anthropic/claude-4.5-sonnet");
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.model.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(config.input.prompt_file, "prompt.txt");
        assert!(!config.graph.enable_diagram);
        assert_eq!(
            config.source_attribution.get("model.name"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_file_discovered_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[model]\nname = \"openai/gpt-4o\"\n\n[graph]\nenable_diagram = true\n\n[skills]\ndir = \"my_skills\"\n",
        );
        let nested = temp.path().join("tasks/blink");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_with_env(&nested, &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.model.name, "openai/gpt-4o");
        assert!(config.graph.enable_diagram);
        assert_eq!(config.skills.dir, temp.path().join("my_skills"));
        assert_eq!(
            config.source_attribution.get("model.name"),
            Some(&ConfigSource::Config)
        );
    }

    #[test]
    fn test_precedence_cli_over_env_over_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();

        let cli = CliArgs {
            model: Some("cli/model".to_string()),
            temperature: Some(0.7),
            ..CliArgs::default()
        };
        let env = |key: &str| {
            (key == "OPENAI_BASE_URL").then(|| "http://localhost:4000/v1".to_string())
        };

        let config = Config::discover_with_env(temp.path(), &cli, env).unwrap();

        assert_eq!(config.model.name, "cli/model");
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.model.api_base, "http://localhost:4000/v1");
        assert_eq!(
            config.source_attribution.get("model.api_base"),
            Some(&ConfigSource::Env)
        );
    }

    #[test]
    fn test_file_api_base_wins_over_env() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[model]\napi_base = \"https://example.test/v1\"\n");
        let env = |_: &str| Some("http://ignored/v1".to_string());

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), env).unwrap();

        assert_eq!(config.model.api_base, "https://example.test/v1");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[model]\nnmae = \"typo\"\n");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env)
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    fn test_explicit_missing_config_path() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("absent.toml")),
            ..CliArgs::default()
        };

        let err = Config::discover_with_env(temp.path(), &cli, no_env).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[model]\nname = \"outer\"\n");
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(Config::discover_config_file_from(&repo), None);
    }
}
