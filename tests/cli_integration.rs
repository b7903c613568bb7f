//! CLI integration tests for taskmap
//!
//! These tests drive the binary end to end: project setup, task lifecycle,
//! dependency mutation, validation, repair and next-work selection.

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command instance for the taskmap binary
fn taskmap_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskmap"));
    cmd.env_remove("TASKMAP_FILE").env_remove("TASKMAP_LOG");
    cmd
}

/// Create a temporary directory and initialize a taskmap project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    taskmap_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

/// Run a command inside the project and return its stdout
fn run_ok(dir: &Path, args: &[&str]) -> String {
    let out = taskmap_cmd()
        .current_dir(dir)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(out).unwrap()
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--format", "json"];
    full.extend_from_slice(args);
    serde_json::from_str(&run_ok(dir, &full)).unwrap()
}

/// Write a raw task document outside any project
fn write_tasks(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("tasks.json");
    fs::write(&path, json).unwrap();
    path
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    taskmap_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized taskmap project"));

    assert!(dir.path().join(".taskmap").is_dir());
    assert!(dir.path().join(".taskmap/config.toml").is_file());
    assert!(dir.path().join(".taskmap/tasks.json").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Keep me"]);

    taskmap_cmd().arg("init").arg(dir.path()).assert().success();

    let list = run_ok(dir.path(), &["task", "list"]);
    assert!(list.contains("Keep me"));
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a taskmap project"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_task_add_and_list() {
    let dir = setup_project();

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "add", "Setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task: 1 - Setup"));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "add", "API", "--depends-on", "1", "--priority", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task: 2 - API"));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "add", "Routes", "--parent", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task: 2.1 - Routes"));

    let list = run_ok(dir.path(), &["task", "list"]);
    assert!(list.contains("Setup"));
    assert!(list.contains("API"));
    assert!(list.contains("Routes"));

    let items = run_json(dir.path(), &["task", "list"]);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1]["dependencies"], serde_json::json!([1]));
    assert_eq!(items[2]["id"], "2.1");
    assert_eq!(items[2]["parent_id"], 2);
}

#[test]
fn test_task_add_with_bad_dependency_saves_nothing() {
    let dir = setup_project();

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "add", "Orphan", "--depends-on", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    let items = run_json(dir.path(), &["task", "list"]);
    assert!(items.as_array().unwrap().is_empty());
}

#[test]
fn test_task_status_done_cascades_to_subtasks() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);
    run_ok(dir.path(), &["task", "add", "First", "--parent", "1"]);
    run_ok(dir.path(), &["task", "add", "Second", "--parent", "1"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "status", "1", "done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 updated"));

    let sub = run_json(dir.path(), &["task", "show", "1.2"]);
    assert_eq!(sub["status"], "done");
}

#[test]
fn test_task_status_rejects_unknown_status() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "status", "1", "finished"])
        .assert()
        .failure();
}

#[test]
fn test_task_remove_purges_references() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Base"]);
    run_ok(dir.path(), &["task", "add", "Top", "--depends-on", "1"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "remove", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 reference(s) purged"));

    let top = run_json(dir.path(), &["task", "show", "2"]);
    assert_eq!(top["dependencies"], serde_json::json!([]));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "validate"])
        .assert()
        .success();
}

#[test]
fn test_task_show_lists_dependents() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Base"]);
    run_ok(dir.path(), &["task", "add", "Top", "--depends-on", "1"]);

    let base = run_json(dir.path(), &["task", "show", "1"]);
    assert_eq!(base["dependents"], serde_json::json!([2]));
    assert_eq!(base["eligible"], true);

    let top = run_ok(dir.path(), &["task", "show", "2"]);
    assert!(top.contains("BLOCKED"));
}

#[test]
fn test_promote_rewrites_references() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);
    run_ok(dir.path(), &["task", "add", "Schema", "--parent", "1"]);
    run_ok(dir.path(), &["task", "add", "Routes", "--parent", "1", "--depends-on", "1.1"]);
    run_ok(dir.path(), &["task", "add", "Docs", "--parent", "1"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "promote", "1.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved 1.1 to 2"));

    let routes = run_json(dir.path(), &["task", "show", "1.2"]);
    assert_eq!(routes["dependencies"], serde_json::json!([2]));

    let promoted = run_json(dir.path(), &["task", "show", "2"]);
    assert_eq!(promoted["title"], "Schema");
}

#[test]
fn test_demote_moves_task_under_parent() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);
    run_ok(dir.path(), &["task", "add", "Child"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "demote", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved 2 to 1.1"));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "demote", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("subtask of itself"));
}

#[test]
fn test_conversions_keep_a_startable_subtask() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);
    run_ok(dir.path(), &["task", "add", "Schema", "--parent", "1"]);
    run_ok(dir.path(), &["task", "add", "Routes", "--parent", "1", "--depends-on", "1.1"]);
    run_ok(dir.path(), &["task", "add", "Base"]);
    run_ok(dir.path(), &["task", "add", "Blocked", "--depends-on", "2"]);

    // Promoting 1.1 would leave 1.2 as the only, blocked, subtask
    taskmap_cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "task", "promote", "1.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""kind":"validation""#));

    // Task 2 has no subtasks, so a dependent task cannot be its first
    taskmap_cmd()
        .current_dir(dir.path())
        .args(["task", "demote", "3", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no subtask without dependencies"));

    let parent = run_json(dir.path(), &["task", "show", "1"]);
    assert_eq!(parent["subtasks"], serde_json::json!(["1.1", "1.2"]));
    let blocked = run_json(dir.path(), &["task", "show", "3"]);
    assert_eq!(blocked["dependencies"], serde_json::json!([2]));
}

#[test]
fn test_demote_task_with_subtasks_is_state_conflict() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Parent"]);
    run_ok(dir.path(), &["task", "add", "Other"]);
    run_ok(dir.path(), &["task", "add", "Sub", "--parent", "2"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "task", "demote", "2", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""kind":"state_conflict""#));
}

// =============================================================================
// Dependency Tests
// =============================================================================

#[test]
fn test_deps_add_rejects_cycle() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);
    run_ok(dir.path(), &["task", "add", "Two", "--depends-on", "1"]);
    run_ok(dir.path(), &["task", "add", "Three", "--depends-on", "2"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "add", "1", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("would create a cycle"));

    let one = run_json(dir.path(), &["task", "show", "1"]);
    assert_eq!(one["dependencies"], serde_json::json!([]));
}

#[test]
fn test_deps_add_rejects_self_and_missing() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "add", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Self-dependency"));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "add", "1", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_deps_add_duplicate_is_noop() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);
    run_ok(dir.path(), &["task", "add", "Two"]);

    run_ok(dir.path(), &["deps", "add", "2", "1"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "add", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already depends on"));

    let two = run_json(dir.path(), &["task", "show", "2"]);
    assert_eq!(two["dependencies"], serde_json::json!([1]));
}

#[test]
fn test_deps_add_sorts_tasks_before_subtasks() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);
    run_ok(dir.path(), &["task", "add", "Two"]);
    run_ok(dir.path(), &["task", "add", "Sub", "--parent", "1"]);
    run_ok(dir.path(), &["task", "add", "Three"]);

    run_ok(dir.path(), &["deps", "add", "3", "1.1"]);
    run_ok(dir.path(), &["deps", "add", "3", "2"]);

    let three = run_json(dir.path(), &["task", "show", "3"]);
    assert_eq!(three["dependencies"], serde_json::json!([2, "1.1"]));
}

#[test]
fn test_deps_remove_absent_edge_is_noop() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);
    run_ok(dir.path(), &["task", "add", "Two", "--depends-on", "1"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "remove", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no longer depends on"));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["deps", "remove", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not depend on"));
}

#[test]
fn test_json_errors_carry_kind() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "One"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "deps", "add", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""kind":"validation""#))
        .stderr(predicate::str::contains(r#""success":false"#));

    taskmap_cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "task", "show", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""kind":"not_found""#));
}

// =============================================================================
// Validation and Repair Tests
// =============================================================================

const BROKEN: &str = r#"{
  "tasks": [
    {"id": 1, "title": "A", "dependencies": [2]},
    {"id": 2, "title": "B", "dependencies": [1]},
    {"id": 3, "title": "C", "dependencies": [3, 99], "details": "kept"}
  ]
}"#;

#[test]
fn test_validate_reports_every_issue() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, BROKEN);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[missing] 3 depends on missing 99"))
        .stdout(predicate::str::contains("[self] 3 depends on itself"))
        .stdout(predicate::str::contains("[circular] 1 is part of a cycle: 1 -> 2 -> 1"))
        .stdout(predicate::str::contains("[circular] 2 is part of a cycle"));
}

#[test]
fn test_fix_removes_fixable_issues_and_leaves_cycles() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, BROKEN);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "fix"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Fixed: 3 depends on itself"))
        .stdout(predicate::str::contains("Fixed: 3 depends on missing 99"))
        .stdout(predicate::str::contains("must be resolved manually"));

    let out = taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["--format", "json", "deps", "validate"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i["type"] == "circular"));

    // Unknown fields survive the rewrite
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(raw["tasks"][2]["details"], "kept");
    assert_eq!(raw["tasks"][2]["dependencies"], serde_json::json!([]));
}

#[test]
fn test_validate_siblings_of_is_strict() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(
        &dir,
        r#"{"tasks": [
            {"id": 1, "title": "P", "subtasks": [
                {"id": 1, "title": "a"},
                {"id": 2, "title": "b", "dependencies": ["1.1", 2]}
            ]},
            {"id": 2, "title": "Q"}
        ]}"#,
    );

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependency issues found"));

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "validate", "--siblings-of", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1.2 depends on missing 2"));
}

const STUCK_SUBTASKS: &str = r#"{"tasks": [
    {"id": 1, "title": "P", "dependencies": ["1.1"], "subtasks": [
        {"id": 1, "title": "a", "dependencies": [2]},
        {"id": 2, "title": "b", "dependencies": ["1.1", "1.1"]}
    ]},
    {"id": 2, "title": "Q"}
]}"#;

#[test]
fn test_repair_keeps_subtree_startable() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, STUCK_SUBTASKS);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "repair"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared dependencies of 1.1"))
        .stdout(predicate::str::contains("Removed 1 duplicate"));

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(raw["tasks"][0]["dependencies"], serde_json::json!([]));
    assert_eq!(raw["tasks"][0]["subtasks"][0]["dependencies"], serde_json::json!([]));
    assert_eq!(raw["tasks"][0]["subtasks"][1]["dependencies"], serde_json::json!(["1.1"]));

    // A second run has nothing left to do
    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "repair"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to repair"));
}

#[test]
fn test_repair_without_progress_enforcement_keeps_subtask_dependencies() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, STUCK_SUBTASKS);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["--no-enforce-progress", "deps", "repair"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared dependencies").not());

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(raw["tasks"][0]["subtasks"][0]["dependencies"], serde_json::json!([2]));
}

const SUBTASK_CYCLE: &str = r#"{"tasks": [
    {"id": 1, "title": "P", "subtasks": [
        {"id": 1, "title": "a", "dependencies": ["1.2"]},
        {"id": 2, "title": "b", "dependencies": ["1.1"]}
    ]}
]}"#;

#[test]
fn test_fix_leaves_subtask_cycle_unchanged() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, SUBTASK_CYCLE);

    for action in ["fix", "repair"] {
        taskmap_cmd()
            .current_dir(dir.path())
            .arg("--file")
            .arg(&file)
            .args(["deps", action])
            .assert()
            .failure()
            .stdout(predicate::str::contains(format!("Nothing to {}", action)))
            .stdout(predicate::str::contains("[circular] 1.1 is part of a cycle"))
            .stdout(predicate::str::contains("Cleared dependencies").not());
    }

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(raw["tasks"][0]["subtasks"][0]["dependencies"], serde_json::json!(["1.2"]));
    assert_eq!(raw["tasks"][0]["subtasks"][1]["dependencies"], serde_json::json!(["1.1"]));
}

#[test]
fn test_malformed_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(&dir, r#"{"tasks": [{"id": 1, "title": "x", "dependencies": ["a.b"]}]}"#);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["deps", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse task file"));
}

// =============================================================================
// Next-Work Tests
// =============================================================================

#[test]
fn test_next_prefers_priority_among_eligible() {
    let dir = TempDir::new().unwrap();
    let file = write_tasks(
        &dir,
        r#"{"tasks": [
            {"id": 1, "title": "Done", "status": "done"},
            {"id": 2, "title": "Urgent", "priority": "high", "dependencies": [1]},
            {"id": 3, "title": "Later", "priority": "low"}
        ]}"#,
    );

    let out = taskmap_cmd()
        .current_dir(dir.path())
        .arg("--file")
        .arg(&file)
        .args(["--format", "json", "next"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let item: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(item["id"], 2);
    assert_eq!(item["title"], "Urgent");
    assert!(item.get("parent_id").is_none());
}

#[test]
fn test_next_prefers_subtasks_of_in_progress_task() {
    let dir = setup_project();
    run_ok(dir.path(), &["task", "add", "Important", "--priority", "high"]);
    run_ok(dir.path(), &["task", "add", "Active", "--priority", "low"]);
    run_ok(dir.path(), &["task", "add", "Step", "--parent", "2"]);
    run_ok(dir.path(), &["task", "status", "2", "in-progress"]);

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: 2.1 - Step"))
        .stdout(predicate::str::contains("Parent: 2"));
}

#[test]
fn test_next_when_nothing_is_eligible() {
    let dir = setup_project();

    taskmap_cmd()
        .current_dir(dir.path())
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("No eligible task"));
}
