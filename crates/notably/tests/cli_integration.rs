//! CLI integration tests for the Notably command-line interface.
//!
//! Every test runs against throwaway config and data directories, with no
//! API key in the environment. Nothing here talks to the generation service.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Isolated config + data directories for one test.
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("config")).unwrap();
        std::fs::create_dir_all(root.path().join("data")).unwrap();
        Self { root }
    }

    fn config_dir(&self) -> std::path::PathBuf {
        self.root.path().join("config")
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.root.path().join("data")
    }

    /// Get a command for the notably binary, confined to this sandbox.
    fn notably(&self) -> Command {
        let mut cmd = Command::cargo_bin("notably").unwrap();
        cmd.current_dir(self.root.path())
            .env("NOTABLY_CONFIG_DIR", self.config_dir())
            .env("NOTABLY_DATA_DIR", self.data_dir())
            .env_remove("ANTHROPIC_API_KEY");
        cmd
    }

    fn write_source(&self, name: &str, text: &str) -> std::path::PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// `add --no-generate --json` and return the new note's id.
    fn add_draft(&self, path: &Path) -> String {
        let output = self
            .notably()
            .args(["--json", "add", "--no-generate"])
            .arg(path)
            .output()
            .unwrap();
        assert!(output.status.success(), "{:?}", output);
        let note: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        note["id"].as_str().unwrap().to_string()
    }

    fn list_json(&self) -> Vec<serde_json::Value> {
        let output = self.notably().args(["--json", "list"]).output().unwrap();
        assert!(output.status.success(), "{:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    Sandbox::new()
        .notably()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Notably"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("revise"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("share"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    Sandbox::new()
        .notably()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("notably"));
}

#[test]
fn test_unknown_format_rejected() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("a.txt", "text");
    sandbox
        .notably()
        .args(["add", "--no-generate", "--format", "haiku"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Note Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_list_empty() {
    Sandbox::new()
        .notably()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes yet"));
}

#[test]
fn test_add_draft_then_list_and_show() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("lecture.txt", "Cells divide by mitosis.");
    let id = sandbox.add_draft(&path);

    let notes = sandbox.list_json();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["id"], id.as_str());
    assert_eq!(notes[0]["title"], "Generating...");
    assert_eq!(notes[0]["sourceFileName"], "lecture.txt");
    assert_eq!(notes[0]["sourceType"], "document");
    assert_eq!(notes[0]["format"], "bullet-points");
    assert_eq!(notes[0]["summary"], "");

    sandbox
        .notably()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generating..."))
        .stdout(predicate::str::contains("Not generated yet"));
}

#[test]
fn test_persisted_blob_drops_file_uri() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("scan.png", "not really a png");
    sandbox
        .notably()
        .args(["add", "--no-generate", "--format", "outline", "-i", "focus on dates"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Note created"));

    let blob = std::fs::read_to_string(sandbox.data_dir().join("notably-notes.json")).unwrap();
    let notes: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].get("fileUri").is_none());
    assert_eq!(notes[0]["sourceType"], "image");
    assert_eq!(notes[0]["format"], "outline");
    assert_eq!(notes[0]["customInstructions"], "focus on dates");
}

#[test]
fn test_delete_requires_confirmation() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("a.txt", "alpha");
    let id = sandbox.add_draft(&path);

    // stdin is not a terminal, so the prompt answers "no"
    sandbox
        .notably()
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));
    assert_eq!(sandbox.list_json().len(), 1);

    sandbox
        .notably()
        .args(["delete", "--yes", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));
    assert!(sandbox.list_json().is_empty());
}

#[test]
fn test_unknown_id_fails() {
    let sandbox = Sandbox::new();
    for args in [
        vec!["show", "404"],
        vec!["delete", "--yes", "404"],
        vec!["share", "--print", "404"],
    ] {
        sandbox
            .notably()
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Note not found: 404"));
    }
}

#[test]
fn test_share_print() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("a.txt", "alpha");
    let id = sandbox.add_draft(&path);

    sandbox
        .notably()
        .args(["share", "--print", &id])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Generating...\n\n"));
}

#[test]
fn test_add_missing_file_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .notably()
        .args(["add", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation Without a Key
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_add_without_api_key_creates_nothing() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("a.txt", "alpha");
    sandbox
        .notably()
        .arg("add")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
    assert!(sandbox.list_json().is_empty());
}

#[test]
fn test_generate_and_revise_without_api_key_fail() {
    let sandbox = Sandbox::new();
    let path = sandbox.write_source("a.txt", "alpha");
    let id = sandbox.add_draft(&path);

    sandbox
        .notably()
        .args(["generate", &id, "--source"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
    sandbox
        .notably()
        .args(["revise", &id, "make", "it", "shorter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_override_dir() {
    let sandbox = Sandbox::new();
    sandbox
        .notably()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(
            sandbox.config_dir().display().to_string(),
        ));
}

#[test]
fn test_config_init_then_show() {
    let sandbox = Sandbox::new();
    sandbox
        .notably()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(sandbox.config_dir().join("config.toml").is_file());

    sandbox
        .notably()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    sandbox
        .notably()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude-sonnet-4-5"))
        .stdout(predicate::str::contains("content_limit: 5000 chars"));
}

#[test]
fn test_project_config_sets_content_limit() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.root.path().join("notably.toml"),
        "[storage]\ncontent_limit = 7\n",
    )
    .unwrap();

    let output = sandbox
        .notably()
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["storage"]["content_limit"], 7);
}
