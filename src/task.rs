//! Task directories and run directories.
//!
//! A task directory holds a prompt file (`prompt.txt` by default). Each run
//! writes into `<task>/runs/<YYYY-MM-DD_HH-MM-SS>/`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use embedgen_engine::WorkflowState;
use embedgen_utils::EmbedgenError;

/// Subdirectory of a task directory that holds run directories.
pub const RUNS_DIR: &str = "runs";

/// Local-time format of run directory names.
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A validated task: its directory, name and trimmed requirement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub dir: PathBuf,
    pub name: String,
    pub prompt_file: String,
    pub requirements: String,
}

impl TaskInput {
    /// Read `dir/prompt_file`.
    ///
    /// # Errors
    ///
    /// `EmbedgenError::InvalidTask` when the directory or prompt file is
    /// missing or unreadable.
    pub fn load(dir: &Path, prompt_file: &str) -> Result<Self, EmbedgenError> {
        let invalid = |reason: String| EmbedgenError::InvalidTask {
            path: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }

        let prompt_path = dir.join(prompt_file);
        if !prompt_path.is_file() {
            return Err(invalid(format!("{prompt_file} not found")));
        }
        let raw = fs::read_to_string(&prompt_path)
            .map_err(|e| invalid(format!("cannot read {prompt_file}: {e}")))?;

        let name = task_name(dir).ok_or_else(|| invalid("cannot determine task name".to_string()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            prompt_file: prompt_file.to_string(),
            requirements: raw.trim().to_string(),
        })
    }

    /// Path of the run directory for a run started at `started`.
    #[must_use]
    pub fn run_dir_for(&self, started: DateTime<Local>) -> PathBuf {
        self.dir
            .join(RUNS_DIR)
            .join(started.format(RUN_DIR_FORMAT).to_string())
    }

    /// Create the run directory for `started`. An existing directory is reused.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created.
    pub fn create_run_dir(&self, started: DateTime<Local>) -> Result<PathBuf, EmbedgenError> {
        let run_dir = self.run_dir_for(started);
        fs::create_dir_all(&run_dir)?;
        Ok(run_dir)
    }

    /// Initial workflow state for a run in `run_dir`.
    #[must_use]
    pub fn initial_state(&self, run_dir: &Path) -> WorkflowState {
        WorkflowState::new(
            self.requirements.clone(),
            self.name.clone(),
            self.prompt_file.clone(),
            run_dir,
        )
    }
}

/// The last component of `dir`, resolving `.` and `..` first.
fn task_name(dir: &Path) -> Option<String> {
    let resolved = match dir.file_name() {
        Some(_) => dir.to_path_buf(),
        None => dir.canonicalize().ok()?,
    };
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn task_with_prompt(prompt: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("blink_led");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("prompt.txt"), prompt).unwrap();
        (temp, dir)
    }

    #[test]
    fn test_load_trims_requirements() {
        let (_temp, dir) = task_with_prompt("\n  Blink an LED on GPIO2.  \n\n");
        let task = TaskInput::load(&dir, "prompt.txt").unwrap();

        assert_eq!(task.name, "blink_led");
        assert_eq!(task.requirements, "Blink an LED on GPIO2.");
        assert_eq!(task.prompt_file, "prompt.txt");
    }

    #[test]
    fn test_missing_prompt_is_invalid_task() {
        let temp = TempDir::new().unwrap();
        let err = TaskInput::load(temp.path(), "prompt.txt").unwrap_err();

        match err {
            EmbedgenError::InvalidTask { reason, .. } => {
                assert!(reason.contains("prompt.txt not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory_is_invalid_task() {
        let temp = TempDir::new().unwrap();
        let err = TaskInput::load(&temp.path().join("nope"), "prompt.txt").unwrap_err();
        assert!(matches!(err, EmbedgenError::InvalidTask { .. }));
    }

    #[test]
    fn test_custom_prompt_file() {
        let (_temp, dir) = task_with_prompt("unused");
        fs::write(dir.join("req.md"), "Read a DHT22").unwrap();

        let task = TaskInput::load(&dir, "req.md").unwrap();
        assert_eq!(task.requirements, "Read a DHT22");
    }

    #[test]
    fn test_run_dir_uses_local_timestamp() {
        let (_temp, dir) = task_with_prompt("x");
        let task = TaskInput::load(&dir, "prompt.txt").unwrap();
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

        let run_dir = task.create_run_dir(started).unwrap();
        assert_eq!(run_dir, dir.join("runs").join("2024-03-09_07-05-01"));
        assert!(run_dir.is_dir());

        // Same second reuses the directory.
        assert_eq!(task.create_run_dir(started).unwrap(), run_dir);
    }

    #[test]
    fn test_initial_state_carries_task_fields() {
        let (_temp, dir) = task_with_prompt("Blink");
        let task = TaskInput::load(&dir, "prompt.txt").unwrap();
        let run_dir = dir.join("runs").join("r1");

        let state = task.initial_state(&run_dir);
        assert_eq!(state.requirements, "Blink");
        assert_eq!(state.task_name, "blink_led");
        assert_eq!(state.run_dir, run_dir);
        assert_eq!(state.run_id(), "r1");
        assert!(state.project_name.is_none());
    }

    proptest! {
        #[test]
        fn prop_run_dir_is_one_sortable_component(
            secs in 0i64..4_102_444_800,
        ) {
            let task = TaskInput {
                dir: PathBuf::from("tasks/blink"),
                name: "blink".to_string(),
                prompt_file: "prompt.txt".to_string(),
                requirements: String::new(),
            };
            let started = Local.timestamp_opt(secs, 0).unwrap();
            let run_dir = task.run_dir_for(started);

            prop_assert_eq!(run_dir.parent(), Some(Path::new("tasks/blink/runs")));
            let name = run_dir.file_name().unwrap().to_string_lossy().into_owned();
            prop_assert_eq!(name.len(), 19);
            prop_assert_eq!(name, started.format(RUN_DIR_FORMAT).to_string());
        }
    }
}
