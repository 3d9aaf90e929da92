//! Integration tests for built-in providers driven from a manifest.

use converge::config::{load_config, parse_config};
use converge::engine::{DiffType, Executor, Planner, RunContext, StepStatus};
use converge::providers::build_graph;
use converge::providers::file::fingerprint;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn manifest(temp: &TempDir, content: &str) -> converge::config::ConvergeConfig {
    fs::write(temp.path().join("converge.yml"), content).unwrap();
    load_config(temp.path(), None).unwrap()
}

#[test]
fn file_change_is_planned_as_modify() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("motd"), "old").unwrap();
    let config = manifest(
        &temp,
        "steps:\n  - type: file\n    path: motd\n    content: new\n",
    );

    let graph = build_graph(&config, temp.path()).unwrap();
    let plan = Planner::new().plan(&RunContext::new(), &graph).unwrap();

    let entry = plan.get("file:write:motd").unwrap();
    assert_eq!(entry.status(), StepStatus::NeedsApply);
    assert_eq!(entry.diff().diff_type, DiffType::Modify);
    assert_eq!(entry.diff().old_value, fingerprint(b"old"));
    assert_eq!(entry.diff().new_value, fingerprint(b"new"));
}

#[test]
fn full_manifest_applies_then_is_satisfied() {
    let temp = TempDir::new().unwrap();
    let config = manifest(
        &temp,
        r#"
steps:
  - type: directory
    path: etc
  - type: file
    path: etc/app.conf
    content: "debug = false\n"
    depends_on: ["dir:create:etc"]
"#,
    );

    let graph = build_graph(&config, temp.path()).unwrap();
    let ctx = RunContext::new();
    let plan = Planner::new().plan(&ctx, &graph).unwrap();
    assert_eq!(plan.needs_apply().len(), 2);

    let outcome = Executor::new().execute(&ctx, &plan);
    assert!(outcome.success());
    assert_eq!(
        fs::read_to_string(temp.path().join("etc/app.conf")).unwrap(),
        "debug = false\n"
    );

    let replan = Planner::new().plan(&ctx, &graph).unwrap();
    assert!(!replan.has_changes());
}

#[cfg(unix)]
#[test]
fn failed_run_rolls_back_files_and_links() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("zshrc"), "export EDITOR=vi\n").unwrap();
    fs::write(temp.path().join("notes.txt"), "keep me").unwrap();

    let config = parse_config(
        r#"
settings:
  rollback_on_failure: true
steps:
  - type: link
    source: zshrc
    target: home/.zshrc
    depends_on: ["dir:create:home"]
  - type: directory
    path: home
  - type: file
    path: notes.txt
    content: overwritten
  - type: command
    name: explode
    check: "false"
    apply: "exit 1"
    depends_on: ["link:create:home/.zshrc", "file:write:notes.txt"]
"#,
        Path::new("converge.yml"),
    )
    .unwrap();

    let graph = build_graph(&config, temp.path()).unwrap();
    let ctx = RunContext::new();
    let plan = Planner::new().plan(&ctx, &graph).unwrap();
    let outcome = Executor::new()
        .with_rollback_on_failure(config.settings.rollback_on_failure)
        .execute(&ctx, &plan);

    assert!(outcome.rolled_back());
    assert!(outcome.rollback_results().iter().all(|r| r.success));
    assert_eq!(
        fs::read_to_string(temp.path().join("notes.txt")).unwrap(),
        "keep me"
    );
    assert!(fs::symlink_metadata(temp.path().join("home/.zshrc")).is_err());
    assert!(!temp.path().join("home").exists());
}

#[test]
fn validation_errors_surface_before_planning() {
    let config = parse_config(
        "steps:\n  - type: file\n    path: a\n  - type: directory\n    path: a\n    id: x\n    depends_on: [x]\n",
        Path::new("converge.yml"),
    )
    .unwrap();

    let err = build_graph(&config, Path::new("/tmp")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'content'"));
    assert!(message.contains("depends on itself"));
}
