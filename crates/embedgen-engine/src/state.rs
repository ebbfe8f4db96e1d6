//! The record threaded through every stage, and the partial updates stages
//! return.
//!
//! Merge policy is explicit per field: `debug_logs` and `messages` are
//! append-only, every other field in [`StateUpdate`] overwrites when set.
//! Run identity (`requirements`, `task_name`, `prompt_file`, `run_dir`) is
//! fixed before the engine starts and cannot be expressed as an update.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use embedgen_llm::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::artifact::Artifact;

/// Directory under the run directory that receives artifacts.
pub const OUTPUT_DIR: &str = "output";

/// Skill name that selects the Arduino target.
pub const ARDUINO_SKILL: &str = "arduino";

/// Build target of the generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "arduino")]
    Arduino,
    #[serde(rename = "esp-idf")]
    EspIdf,
}

impl Target {
    /// `Arduino` iff the `arduino` skill is active; ESP-IDF otherwise.
    #[must_use]
    pub fn from_skills(skills: &[String]) -> Self {
        if skills.iter().any(|s| s == ARDUINO_SKILL) {
            Self::Arduino
        } else {
            Self::EspIdf
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arduino => "arduino",
            Self::EspIdf => "esp-idf",
        }
    }

    /// Main source file, relative to the output root.
    #[must_use]
    pub fn source_path(self, project_name: &str) -> PathBuf {
        match self {
            Self::Arduino => PathBuf::from(format!("{project_name}.ino")),
            Self::EspIdf => PathBuf::from("main").join("main.c"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and for what a run's artifacts are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub output_root: PathBuf,
    pub target: Target,
    pub project_name: String,
    /// Relative to `output_root`.
    pub source_path: PathBuf,
}

impl WorkspaceInfo {
    /// The layout for a project in `run_dir`. Pure; creates nothing.
    #[must_use]
    pub fn derive(run_dir: &Path, project_name: &str, active_skills: &[String]) -> Self {
        let target = Target::from_skills(active_skills);
        Self {
            output_root: run_dir.join(OUTPUT_DIR),
            target,
            project_name: project_name.to_string(),
            source_path: target.source_path(project_name),
        }
    }

    /// Artifact path of the main source file, `/`-separated.
    #[must_use]
    pub fn source_artifact_path(&self) -> String {
        self.source_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// One record of a remote model exchange, persisted to `debug.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds, rounded to two decimals.
    pub duration_ms: f64,
    pub input: Value,
    pub output: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(node: impl Into<String>, elapsed: Duration, input: Value, output: Value) -> Self {
        Self {
            node: node.into(),
            timestamp: Utc::now(),
            duration_ms: round_ms(elapsed),
            input,
            output,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Shared state of one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub requirements: String,
    pub task_name: String,
    pub prompt_file: String,
    pub run_dir: PathBuf,

    pub project_name: Option<String>,
    #[serde(default)]
    pub active_skills: Vec<String>,
    pub active_skill_content: Option<String>,
    pub workspace: Option<WorkspaceInfo>,

    pub code_content: Option<String>,
    pub diagram_content: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default)]
    pub debug_logs: Vec<LogEntry>,
    #[serde(default)]
    pub messages: Vec<Message>,

    pub status_msg: Option<String>,
    pub manifest_path: Option<PathBuf>,
    #[serde(default)]
    pub persisted_paths: Vec<PathBuf>,
}

impl WorkflowState {
    #[must_use]
    pub fn new(
        requirements: impl Into<String>,
        task_name: impl Into<String>,
        prompt_file: impl Into<String>,
        run_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            requirements: requirements.into(),
            task_name: task_name.into(),
            prompt_file: prompt_file.into(),
            run_dir: run_dir.into(),
            ..Self::default()
        }
    }

    /// Identifier used to correlate logs and model calls: the run
    /// directory's name.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.run_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string())
    }

    /// Merge one stage's update.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            project_name,
            active_skills,
            active_skill_content,
            workspace,
            code_content,
            diagram_content,
            artifacts,
            status_msg,
            manifest_path,
            persisted_paths,
            debug_logs,
            messages,
        } = update;

        overwrite(&mut self.project_name, project_name);
        if let Some(skills) = active_skills {
            self.active_skills = skills;
        }
        overwrite(&mut self.active_skill_content, active_skill_content);
        overwrite(&mut self.workspace, workspace);
        overwrite(&mut self.code_content, code_content);
        overwrite(&mut self.diagram_content, diagram_content);
        if let Some(artifacts) = artifacts {
            self.artifacts = artifacts;
        }
        overwrite(&mut self.status_msg, status_msg);
        overwrite(&mut self.manifest_path, manifest_path);
        if let Some(paths) = persisted_paths {
            self.persisted_paths = paths;
        }

        self.debug_logs.extend(debug_logs);
        self.messages.extend(messages);
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Partial state produced by one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub project_name: Option<String>,
    pub active_skills: Option<Vec<String>>,
    pub active_skill_content: Option<String>,
    pub workspace: Option<WorkspaceInfo>,
    pub code_content: Option<String>,
    pub diagram_content: Option<String>,
    pub artifacts: Option<Vec<Artifact>>,
    pub status_msg: Option<String>,
    pub manifest_path: Option<PathBuf>,
    pub persisted_paths: Option<Vec<PathBuf>>,

    /// Appended in order.
    pub debug_logs: Vec<LogEntry>,
    /// Appended in order.
    pub messages: Vec<Message>,
}

impl StateUpdate {
    /// Names of the overwrite-policy fields this update sets.
    #[must_use]
    pub fn scalar_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        mark(self.project_name.is_some(), "project_name");
        mark(self.active_skills.is_some(), "active_skills");
        mark(self.active_skill_content.is_some(), "active_skill_content");
        mark(self.workspace.is_some(), "workspace");
        mark(self.code_content.is_some(), "code_content");
        mark(self.diagram_content.is_some(), "diagram_content");
        mark(self.artifacts.is_some(), "artifacts");
        mark(self.status_msg.is_some(), "status_msg");
        mark(self.manifest_path.is_some(), "manifest_path");
        mark(self.persisted_paths.is_some(), "persisted_paths");
        fields
    }

    #[must_use]
    pub fn with_log(mut self, entry: LogEntry) -> Self {
        self.debug_logs.push(entry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log(node: &str) -> LogEntry {
        LogEntry::new(node, Duration::from_millis(5), json!({}), json!(null))
    }

    #[test]
    fn test_target_from_skills() {
        assert_eq!(
            Target::from_skills(&["arduino".to_string(), "wifi".to_string()]),
            Target::Arduino
        );
        assert_eq!(Target::from_skills(&["esp-idf".to_string()]), Target::EspIdf);
        assert_eq!(Target::from_skills(&[]), Target::EspIdf);
    }

    #[test]
    fn test_target_serializes_as_wire_names() {
        assert_eq!(serde_json::to_string(&Target::EspIdf).unwrap(), "\"esp-idf\"");
        assert_eq!(serde_json::to_string(&Target::Arduino).unwrap(), "\"arduino\"");
    }

    #[test]
    fn test_workspace_derive_paths() {
        let ws = WorkspaceInfo::derive(Path::new("/runs/r1"), "blink", &["arduino".to_string()]);
        assert_eq!(ws.output_root, Path::new("/runs/r1/output"));
        assert_eq!(ws.source_artifact_path(), "blink.ino");

        let ws = WorkspaceInfo::derive(Path::new("/runs/r1"), "blink", &[]);
        assert_eq!(ws.target, Target::EspIdf);
        assert_eq!(ws.source_artifact_path(), "main/main.c");
    }

    #[test]
    fn test_log_entry_rounds_duration() {
        let entry = LogEntry::new("coder", Duration::from_micros(12_345_678), json!({}), json!(""));
        assert!((entry.duration_ms - 12345.68).abs() < 1e-9);
    }

    #[test]
    fn test_apply_overwrites_scalars_and_appends_logs() {
        let mut state = WorkflowState::new("req", "task", "prompt.txt", "/runs/r1");
        state.debug_logs.push(log("first"));

        state.apply(StateUpdate {
            project_name: Some("a".to_string()),
            active_skills: Some(vec!["esp-idf".to_string()]),
            ..StateUpdate::default()
        }
        .with_log(log("second")));

        state.apply(StateUpdate {
            project_name: Some("b".to_string()),
            ..StateUpdate::default()
        }
        .with_log(log("third")));

        assert_eq!(state.project_name.as_deref(), Some("b"));
        assert_eq!(state.active_skills, vec!["esp-idf"]);
        let nodes: Vec<_> = state.debug_logs.iter().map(|l| l.node.as_str()).collect();
        assert_eq!(nodes, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_apply_leaves_unset_fields_alone() {
        let mut state = WorkflowState::new("req", "task", "prompt.txt", "/runs/r1");
        state.code_content = Some("int x;".to_string());

        state.apply(StateUpdate {
            diagram_content: Some(String::new()),
            ..StateUpdate::default()
        });

        assert_eq!(state.code_content.as_deref(), Some("int x;"));
        assert_eq!(state.diagram_content.as_deref(), Some(""));
        assert_eq!(state.requirements, "req");
    }

    #[test]
    fn test_scalar_fields_lists_set_fields() {
        let update = StateUpdate {
            code_content: Some(String::new()),
            messages: vec![Message::assistant("x")],
            ..StateUpdate::default()
        };
        assert_eq!(update.scalar_fields(), vec!["code_content"]);
        assert!(StateUpdate::default().scalar_fields().is_empty());
    }

    #[test]
    fn test_run_id_is_run_dir_name() {
        let state = WorkflowState::new("r", "t", "p", "/tasks/x/runs/2026-01-01_00-00-00");
        assert_eq!(state.run_id(), "2026-01-01_00-00-00");
    }
}
