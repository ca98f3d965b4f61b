mod support;

use shiftpoints::task::TaskRegistry;
use support::{parse_json, TestEnv};

fn run_maintenance(env: &TestEnv, date: &str) -> serde_json::Value {
    let output = env
        .admin_cmd()
        .args(["maintenance", "run", "--date", date, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    parse_json(&output)
}

#[test]
fn template_materialization_is_idempotent() {
    let env = TestEnv::init();
    env.admin_cmd()
        .args([
            "task", "new", "Morning sweep", "--points", "6", "--template", "--recur", "daily",
        ])
        .assert()
        .success();

    let report = run_maintenance(&env, "2026-03-10");
    assert_eq!(report["data"]["materialized_tasks"].as_u64(), Some(1));

    let report = run_maintenance(&env, "2026-03-10");
    assert_eq!(report["data"]["materialized_tasks"].as_u64(), Some(0));

    // A new date gets its own instance
    let report = run_maintenance(&env, "2026-03-11");
    assert_eq!(report["data"]["materialized_tasks"].as_u64(), Some(1));

    let storage = env.storage();
    let registry: TaskRegistry = storage.read_json(&storage.tasks_file()).expect("registry");
    let instances = registry.tasks.iter().filter(|t| !t.is_template).count();
    assert_eq!(instances, 2);
}

#[test]
fn weekly_template_only_fires_on_its_weekday() {
    let env = TestEnv::init();
    // weekday 0 is Monday; 2026-03-10 is a Tuesday, 2026-03-09 a Monday
    env.admin_cmd()
        .args([
            "task", "new", "Deep clean", "--points", "8", "--template", "--recur", "weekly:0",
        ])
        .assert()
        .success();

    let report = run_maintenance(&env, "2026-03-10");
    assert_eq!(report["data"]["materialized_tasks"].as_u64(), Some(0));

    let report = run_maintenance(&env, "2026-03-09");
    assert_eq!(report["data"]["materialized_tasks"].as_u64(), Some(1));
}

#[test]
fn templates_are_hidden_from_the_default_list() {
    let env = TestEnv::init();
    env.admin_cmd()
        .args([
            "task", "new", "Morning sweep", "--points", "6", "--template", "--recur", "daily",
        ])
        .assert()
        .success();

    let output = env
        .staff_cmd("anna")
        .args(["task", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(parse_json(&output)["data"].as_array().map(|a| a.len()), Some(0));

    let output = env
        .staff_cmd("anna")
        .args(["task", "list", "--templates", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(parse_json(&output)["data"].as_array().map(|a| a.len()), Some(1));
}

#[test]
fn staff_cannot_run_maintenance() {
    let env = TestEnv::init();
    env.staff_cmd("anna")
        .args(["maintenance", "run", "--date", "2026-03-10"])
        .assert()
        .failure()
        .code(3);
}
