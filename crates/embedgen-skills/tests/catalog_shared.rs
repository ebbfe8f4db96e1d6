use std::sync::Arc;

use embedgen_skills::SkillCatalog;
use tempfile::TempDir;

fn seed(root: &std::path::Path, count: usize) {
    for i in 0..count {
        let dir = root.join(format!("skill-{i:02}"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: skill-{i:02}\ndescription: Skill {i}\n---\nBody {i}"),
        )
        .unwrap();
    }
}

#[test]
fn concurrent_scans_and_loads_agree() {
    let temp = TempDir::new().unwrap();
    seed(temp.path(), 8);
    let catalog = Arc::new(SkillCatalog::new(temp.path()));

    let expected = catalog.describe();
    std::thread::scope(|scope| {
        for i in 0..8 {
            let catalog = Arc::clone(&catalog);
            let expected = expected.clone();
            scope.spawn(move || {
                for _ in 0..20 {
                    assert_eq!(catalog.describe(), expected);
                    assert_eq!(
                        catalog.load_skill(&format!("skill-{i:02}")).as_deref(),
                        Some(format!("Body {i}").as_str())
                    );
                }
                if i == 0 {
                    catalog.invalidate();
                }
            });
        }
    });

    assert_eq!(catalog.scan_skills().len(), 8);
}

#[test]
fn nested_skill_directories_are_found() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("vendor").join("espressif").join("esp-idf");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(
        nested.join("SKILL.md"),
        "---\ndescription: Vendor rules\n---\nUse esp_log.",
    )
    .unwrap();

    let catalog = SkillCatalog::new(temp.path());
    assert_eq!(catalog.describe(), "- esp-idf: Vendor rules");
    assert!(catalog.contains("esp-idf"));
    assert_eq!(
        catalog.load_skills(&["esp-idf".to_string()]),
        "=== SKILL: esp-idf ===\nUse esp_log."
    );
}
