use std::path::PathBuf;

/// Command-line overrides fed into [`super::Config::discover`].
///
/// Kept free of clap so library callers can build it directly.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub task_dir: Option<PathBuf>,
    pub prompt_file: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub skills_dir: Option<PathBuf>,
    /// `Some(true)` only; the flag cannot switch the diagram stage off.
    pub enable_diagram: Option<bool>,
}
