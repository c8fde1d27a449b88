//! End-to-end tests for the `cellplan` binary.
//!
//! Every test runs the compiled binary against a `--local` JSON file in a
//! temporary directory, with `XDG_CONFIG_HOME` pointed at the same
//! directory so no real config file is read.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::Local;
use tempfile::TempDir;

const PLAN_TOML: &str = r#"
title = "Test"
goal = "Ship it"

[[phases]]
name = "Build"
steps = ["Write code", "Write tests"]
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn store_path(&self) -> PathBuf {
        self.dir.path().join("plan.json")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cellplan"));
        cmd.env("XDG_CONFIG_HOME", self.dir.path())
            .env("RUST_LOG", "warn")
            .env_remove("CELLPLAN_LOCAL")
            .env_remove("CELLPLAN_SPREADSHEET_ID")
            .env_remove("CELLPLAN_PLAN_CELL")
            .env_remove("CELLPLAN_ACCESS_TOKEN");
        cmd
    }

    /// Run with `--local` pointed at the workspace store.
    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .arg("--local")
            .arg(self.store_path())
            .args(args)
            .output()
            .expect("run cellplan")
    }

    fn ok(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "cellplan {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).expect("utf-8 stdout")
    }

    fn fails(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(!out.status.success(), "cellplan {args:?} should fail");
        String::from_utf8(out.stderr).expect("utf-8 stderr")
    }

    fn create_plan(&self) {
        let file = self.write("plan.toml", PLAN_TOML);
        self.ok(&["plan", "create", path_str(&file)]);
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

// -----------------------------------------------------------------------
// Plan lifecycle
// -----------------------------------------------------------------------

#[test]
fn scenario_start_done_next() {
    let ws = Workspace::new();
    ws.create_plan();

    assert!(ws.ok(&["next"]).contains("1.1 Write code"));

    ws.ok(&["task", "start", "1.1"]);
    let out = ws.ok(&["task", "done", "1.1"]);
    assert!(out.contains("Task 1.1 is now done."));

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let raw = ws.ok(&["plan", "raw"]);
    assert!(
        raw.contains(&format!("- [x] 1.1 Write code ✅ {today}\n")),
        "unexpected plan:\n{raw}"
    );

    assert!(ws.ok(&["next"]).contains("1.2 Write tests"));
}

#[test]
fn plan_init_writes_starter_once() {
    let ws = Workspace::new();
    assert!(ws.ok(&["plan", "init"]).contains("Starter plan written"));
    assert!(ws.ok(&["plan", "init"]).contains("already exists"));
    assert!(ws.ok(&["plan", "show"]).contains("Plan: Getting started"));
}

#[test]
fn show_and_status_summarize_progress() {
    let ws = Workspace::new();
    ws.create_plan();
    ws.ok(&["task", "start", "1.2"]);
    ws.ok(&["task", "block", "1.2", "waiting on fixtures"]);

    let show = ws.ok(&["plan", "show"]);
    assert!(show.contains("Goal: Ship it"));
    assert!(show.contains("Phase 1: Build"));
    assert!(show.contains("[>] 1.2 Write tests  (blocked: waiting on fixtures)"));

    let status = ws.ok(&["plan", "status"]);
    assert!(status.contains("0/2 done (1 todo, 0 doing, 1 blocked, 0 review)"));
}

#[test]
fn review_lists_flagged_tasks() {
    let ws = Workspace::new();
    ws.create_plan();
    assert!(ws.ok(&["review"]).contains("No tasks awaiting review"));

    ws.ok(&["task", "start", "1.1"]);
    ws.ok(&["task", "flag", "1.1", "check naming"]);
    assert!(ws.ok(&["review"]).contains("[!] 1.1 Write code  (review: check naming)"));
}

#[test]
fn notes_are_appended() {
    let ws = Workspace::new();
    ws.create_plan();
    ws.ok(&["notes", "add", "first pass done"]);

    let show = ws.ok(&["plan", "show"]);
    assert!(show.contains("Notes:\n  first pass done"));
}

// -----------------------------------------------------------------------
// Errors and hints
// -----------------------------------------------------------------------

#[test]
fn unknown_step_lists_available_steps() {
    let ws = Workspace::new();
    ws.create_plan();
    let stderr = ws.fails(&["task", "start", "9.9"]);
    assert!(stderr.contains("task 9.9 not found"), "stderr: {stderr}");
    assert!(stderr.contains("hint: available steps: 1.1, 1.2"), "stderr: {stderr}");
}

#[test]
fn empty_cell_suggests_creating_a_plan() {
    let ws = Workspace::new();
    let stderr = ws.fails(&["next"]);
    assert!(stderr.contains("create a plan first"), "stderr: {stderr}");
}

#[test]
fn invalid_transition_is_rejected_but_set_forces() {
    let ws = Workspace::new();
    ws.create_plan();
    let stderr = ws.fails(&["task", "done", "1.1"]);
    assert!(stderr.contains("todo -> done"), "stderr: {stderr}");

    ws.ok(&["task", "set", "1.1", "done"]);
    assert!(ws.ok(&["plan", "raw"]).contains("- [x] 1.1 Write code ✅"));
}

#[test]
fn blank_block_reason_is_rejected() {
    let ws = Workspace::new();
    ws.create_plan();
    ws.ok(&["task", "start", "1.2"]);
    let stderr = ws.fails(&["task", "block", "1.2", ""]);
    assert!(stderr.contains("without a reason or note"), "stderr: {stderr}");
    assert!(ws.ok(&["plan", "raw"]).contains("- [/] 1.2 Write tests\n"));
}

#[test]
fn invalid_plan_file_is_reported() {
    let ws = Workspace::new();
    let file = ws.write("bad.toml", "title = \"\"\ngoal = \"g\"\n[[phases]]\nname = \"a\"\n");
    let stderr = ws.fails(&["plan", "create", path_str(&file)]);
    assert!(stderr.contains("failed to parse plan file"), "stderr: {stderr}");
}

// -----------------------------------------------------------------------
// Config
// -----------------------------------------------------------------------

#[test]
fn init_writes_config_file() {
    let ws = Workspace::new();
    let out = ws
        .command()
        .args(["--spreadsheet-id", "sheet-123", "init"])
        .output()
        .expect("run cellplan");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let path = ws.dir.path().join("cellplan").join("config.toml");
    let content = std::fs::read_to_string(&path).expect("config written");
    assert!(content.contains("spreadsheet_id = \"sheet-123\""));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let again = ws
        .command()
        .args(["--spreadsheet-id", "other", "init"])
        .output()
        .expect("run cellplan");
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));
}

#[test]
fn missing_spreadsheet_id_is_an_error() {
    let ws = Workspace::new();
    let out = ws.command().arg("next").output().expect("run cellplan");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("spreadsheet id not configured"));
}
