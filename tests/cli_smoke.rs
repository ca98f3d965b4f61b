use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn shiftpoints_help_works() {
    Command::cargo_bin("shiftpoints")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task and points lifecycle"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = ["init", "task", "checkin", "goal", "points", "maintenance"];

    for cmd in subcommands {
        Command::cargo_bin("shiftpoints")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn commands_require_initialized_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("shiftpoints")
        .expect("binary")
        .current_dir(dir.path())
        .env("SHIFTPOINTS_ACTOR", "anna")
        .args(["task", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("shiftpoints init"));
}
