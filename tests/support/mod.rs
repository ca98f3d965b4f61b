#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

use shiftpoints::storage::Storage;

/// One isolated data directory with command builders bound to it.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    /// Create a fresh environment and run `shiftpoints init` in it.
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let env = Self { dir };
        env.admin_cmd().arg("init").assert().success();
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join(".shiftpoints")
    }

    pub fn cmd(&self, actor: &str, role: &str) -> Command {
        let mut cmd = Command::cargo_bin("shiftpoints").expect("binary");
        cmd.current_dir(self.dir.path());
        cmd.env("SHIFTPOINTS_DATA_DIR", self.data_dir());
        cmd.env("SHIFTPOINTS_ACTOR", actor);
        cmd.env("SHIFTPOINTS_ROLE", role);
        cmd.env_remove("SHIFTPOINTS_EVENTS");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn admin_cmd(&self) -> Command {
        self.cmd("chef", "admin")
    }

    pub fn staff_cmd(&self, actor: &str) -> Command {
        self.cmd(actor, "staff")
    }

    pub fn storage(&self) -> Storage {
        Storage::new(self.data_dir())
    }

    /// Create a task as admin and return its id.
    pub fn new_task(&self, title: &str, points: i64, due: Option<&str>) -> String {
        let mut cmd = self.admin_cmd();
        cmd.args(["task", "new", title, "--points", &points.to_string(), "--json"]);
        if let Some(due) = due {
            cmd.args(["--due", due]);
        }
        let output = cmd.assert().success().get_output().stdout.clone();
        let value = parse_json(&output);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn parse_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json output")
}
