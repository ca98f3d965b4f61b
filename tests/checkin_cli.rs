mod support;

use support::{parse_json, TestEnv};

fn record_check_in(env: &TestEnv, user: &str) -> serde_json::Value {
    let output = env
        .staff_cmd(user)
        .args(["checkin", "record", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    parse_json(&output)
}

fn total_for(env: &TestEnv, user: &str) -> i64 {
    let output = env
        .staff_cmd(user)
        .args(["points", "total", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    parse_json(&output)["data"]["total"].as_i64().expect("total")
}

#[test]
fn approved_check_in_posts_points() {
    let env = TestEnv::init();
    let value = record_check_in(&env, "anna");
    let id = value["data"]["id"].as_str().expect("check-in id").to_string();

    // No roster row: on time, full provisional bonus
    assert_eq!(value["data"]["minutes_late"].as_u64(), Some(0));
    assert_eq!(value["data"]["points_awarded"].as_i64(), Some(5));
    assert_eq!(total_for(&env, "anna"), 0);

    env.admin_cmd()
        .args(["checkin", "approve", &id])
        .assert()
        .success();
    assert_eq!(total_for(&env, "anna"), 5);

    // Terminal: a second review attempt fails
    env.admin_cmd()
        .args(["checkin", "approve", &id])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn rejected_check_in_posts_nothing() {
    let env = TestEnv::init();
    let value = record_check_in(&env, "anna");
    let id = value["data"]["id"].as_str().expect("check-in id").to_string();

    let output = env
        .admin_cmd()
        .args(["checkin", "reject", &id, "--reason", "wrong shift", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value = parse_json(&output);
    assert_eq!(value["data"]["status"].as_str(), Some("rejected"));
    assert_eq!(value["data"]["points_awarded"].as_i64(), Some(0));
    assert_eq!(total_for(&env, "anna"), 0);

    env.admin_cmd()
        .args(["checkin", "approve", &id])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn points_override_replaces_provisional_value() {
    let env = TestEnv::init();
    let value = record_check_in(&env, "anna");
    let id = value["data"]["id"].as_str().expect("check-in id").to_string();

    env.admin_cmd()
        .args(["checkin", "approve", &id, "--points", "3"])
        .assert()
        .success();
    assert_eq!(total_for(&env, "anna"), 3);
}

#[test]
fn staff_cannot_review_check_ins() {
    let env = TestEnv::init();
    let value = record_check_in(&env, "anna");
    let id = value["data"]["id"].as_str().expect("check-in id").to_string();

    env.staff_cmd("ben")
        .args(["checkin", "approve", &id])
        .assert()
        .failure()
        .code(3);
    env.staff_cmd("ben")
        .args(["checkin", "reject", &id, "--reason", "nope"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn list_filters_by_status() {
    let env = TestEnv::init();
    let first = record_check_in(&env, "anna")["data"]["id"]
        .as_str()
        .expect("id")
        .to_string();
    record_check_in(&env, "ben");

    env.admin_cmd()
        .args(["checkin", "approve", &first])
        .assert()
        .success();

    let output = env
        .admin_cmd()
        .args(["checkin", "list", "--status", "pending", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value = parse_json(&output);
    let pending = value["data"].as_array().expect("array");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["user_id"].as_str(), Some("ben"));
}
