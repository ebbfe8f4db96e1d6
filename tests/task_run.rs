//! Task directory to verified run, through the public library API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use embedgen::cli::execute_verify;
use embedgen::{EmbedgenError, ExitCode, SkillCatalog, TaskInput, WorkflowEngine, WorkflowGraph};
use embedgen_llm::testing::ScriptedBackend;
use embedgen_llm::{GENERATE_STAGE, ModelGateway, PLAN_STAGE};
use tempfile::TempDir;

fn write_skill(root: &Path, name: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("SKILL.md"),
        format!("---\nname: {name}\ndescription: {name} rules\n---\nFollow {name}.\n"),
    )
    .unwrap();
}

fn engine(skills_dir: &Path) -> WorkflowEngine {
    let backend = Arc::new(
        ScriptedBackend::new()
            .respond(
                PLAN_STAGE,
                r#"{"project_name": "blink_led", "selected_skills": ["esp-idf"]}"#,
            )
            .respond(
                GENERATE_STAGE,
                "```c\n#include \"driver/gpio.h\"\nvoid app_main(void) {}\n```",
            ),
    );
    let gateway = ModelGateway::new(backend, "test-model", 0.0, Duration::from_secs(5));
    WorkflowEngine::new(
        WorkflowGraph::standard(false).compile().unwrap(),
        gateway,
        Arc::new(SkillCatalog::new(skills_dir)),
    )
}

struct TaskFixture {
    _temp: TempDir,
    task_dir: std::path::PathBuf,
    skills_dir: std::path::PathBuf,
}

fn fixture() -> TaskFixture {
    let temp = TempDir::new().unwrap();
    let skills_dir = temp.path().join("skills");
    write_skill(&skills_dir, "esp-idf");
    let task_dir = temp.path().join("blink");
    std::fs::create_dir_all(&task_dir).unwrap();
    std::fs::write(task_dir.join("prompt.txt"), "  Blink GPIO2 at 1 Hz.\n").unwrap();
    TaskFixture {
        _temp: temp,
        task_dir,
        skills_dir,
    }
}

#[tokio::test]
async fn test_task_run_persists_and_verifies() {
    let fx = fixture();
    let task = TaskInput::load(&fx.task_dir, "prompt.txt").unwrap();
    let started = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let run_dir = task.create_run_dir(started).unwrap();

    let engine = engine(&fx.skills_dir);
    assert_eq!(
        engine.workflow().layer_names(),
        vec![
            vec!["plan"],
            vec!["prepare_workspace"],
            vec!["generate_code"],
            vec!["assemble_artifacts"],
            vec!["persist"],
        ]
    );
    let state = engine.run(task.initial_state(&run_dir)).await.unwrap();

    assert_eq!(state.task_name, "blink");
    assert_eq!(state.requirements, "Blink GPIO2 at 1 Hz.");
    assert_eq!(
        state.status_msg.as_deref(),
        Some(format!("Project generated at {}", run_dir.display()).as_str())
    );
    assert!(run_dir.ends_with("runs/2024-05-01_12-00-00"));

    let main_c = run_dir.join("output/main/main.c");
    assert_eq!(
        std::fs::read_to_string(&main_c).unwrap(),
        "#include \"driver/gpio.h\"\nvoid app_main(void) {}"
    );

    assert_eq!(execute_verify(&run_dir).unwrap(), 3);
}

#[tokio::test]
async fn test_verify_detects_tampering() {
    let fx = fixture();
    let task = TaskInput::load(&fx.task_dir, "prompt.txt").unwrap();
    let run_dir = task.create_run_dir(Local::now()).unwrap();
    engine(&fx.skills_dir)
        .run(task.initial_state(&run_dir))
        .await
        .unwrap();

    std::fs::write(
        run_dir.join("output/main/main.c"),
        "void app_main(void) { /* edited */ }",
    )
    .unwrap();
    std::fs::remove_file(run_dir.join("output/CMakeLists.txt")).unwrap();

    let err = execute_verify(&run_dir).unwrap_err();
    match &err {
        EmbedgenError::Verification { mismatches, .. } => assert_eq!(*mismatches, 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_exit_code(), ExitCode::INTERNAL);
}

#[test]
fn test_verify_without_manifest_is_invalid_task() {
    let temp = TempDir::new().unwrap();
    let err = execute_verify(temp.path()).unwrap_err();

    assert!(matches!(err, EmbedgenError::InvalidTask { .. }));
    assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
}
