//! CLI Integration Tests
//!
//! These tests verify that the CLI commands work correctly end-to-end.
//! They test the actual binary behavior, not just the library.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::tempdir;

/// Run pagestore against `dir` and return (stdout JSON, exit code)
fn run_pagestore(args: &[&str], dir: &Path) -> (serde_json::Value, i32) {
    run_with_stdin(args, dir, None)
}

fn run_with_stdin(args: &[&str], dir: &Path, stdin: Option<&str>) -> (serde_json::Value, i32) {
    let config = dir.join("config.json");
    let root = dir.join("content");
    let mut child = Command::new(env!("CARGO_BIN_EXE_pagestore"))
        .arg("-c")
        .arg(&config)
        .arg("-r")
        .arg(&root)
        .args(["-f", "json"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute pagestore");

    {
        let mut handle = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            handle.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().expect("Failed to wait on pagestore");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    });
    (value, output.status.code().unwrap_or(-1))
}

// ============================================================================
// Init & Status Tests
// ============================================================================

#[test]
fn test_cli_init_creates_root_and_config() {
    let dir = tempdir().unwrap();

    let (out, code) = run_pagestore(&["init"], dir.path());

    assert_eq!(code, 0);
    assert_eq!(out["status"], "ok");
    assert_eq!(out["backend"], "fs");
    assert!(dir.path().join("content").is_dir());
    assert!(dir.path().join("config.json").is_file());
}

#[test]
fn test_cli_init_without_config_flag_writes_no_config() {
    let dir = tempdir().unwrap();
    let home = dir.path().join("home");
    let output = Command::new(env!("CARGO_BIN_EXE_pagestore"))
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .args(["--memory", "-f", "json", "init"])
        .output()
        .expect("Failed to execute pagestore");

    assert_eq!(output.status.code(), Some(0));
    let out: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["backend"], "memory");
    assert!(out["config"].is_null());
    assert!(!home.join(".config/pagestore/config.json").exists());
}

#[test]
fn test_cli_status_counts() {
    let dir = tempdir().unwrap();
    run_pagestore(&["page", "write", "/a", "A"], dir.path());
    run_pagestore(&["page", "write", "/b/c", "C"], dir.path());
    run_pagestore(&["part", "write", "/nav", "N"], dir.path());

    let (out, code) = run_pagestore(&["status"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(out["pages"], 2);
    assert_eq!(out["parts"], 1);
}

// ============================================================================
// Document CRUD Tests
// ============================================================================

#[test]
fn test_cli_write_and_read_page() {
    let dir = tempdir().unwrap();

    let (out, code) = run_pagestore(
        &["page", "write", "/blog/hello", "# Hello", "-t", "text/markdown"],
        dir.path(),
    );
    assert_eq!(code, 0);
    assert_eq!(out["status"], "ok");

    let (out, code) = run_pagestore(&["page", "read", "blog/hello"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(out["path"], "/blog/hello");
    assert_eq!(out["content_type"], "text/markdown");
    assert_eq!(out["contents"], "# Hello");
}

#[test]
fn test_cli_write_from_stdin_and_file() {
    let dir = tempdir().unwrap();

    let (_, code) = run_with_stdin(
        &["part", "write", "/footer", "-t", "text/html"],
        dir.path(),
        Some("<footer>piped</footer>"),
    );
    assert_eq!(code, 0);
    let (out, _) = run_pagestore(&["part", "read", "/footer"], dir.path());
    assert_eq!(out["contents"], "<footer>piped</footer>");

    let source = dir.path().join("body.html");
    std::fs::write(&source, "<p>from file</p>").unwrap();
    let (_, code) = run_pagestore(
        &["part", "write", "/body", "--file", source.to_str().unwrap()],
        dir.path(),
    );
    assert_eq!(code, 0);
    let (out, _) = run_pagestore(&["part", "read", "/body"], dir.path());
    assert_eq!(out["contents"], "<p>from file</p>");
}

#[test]
fn test_cli_read_missing_page() {
    let dir = tempdir().unwrap();

    let (out, code) = run_pagestore(&["page", "read", "/nope"], dir.path());

    assert_eq!(code, 3);
    assert_eq!(out["status"], "error");
    assert_eq!(out["kind"], "not_exist");
}

#[test]
fn test_cli_delete() {
    let dir = tempdir().unwrap();
    run_pagestore(&["page", "write", "/tmp-page", "x"], dir.path());

    let (out, code) = run_pagestore(&["page", "delete", "/tmp-page"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(out["status"], "ok");

    let (_, code) = run_pagestore(&["page", "delete", "/tmp-page"], dir.path());
    assert_eq!(code, 3);
}

#[test]
fn test_cli_move() {
    let dir = tempdir().unwrap();
    run_pagestore(&["page", "write", "/draft", "text"], dir.path());
    run_pagestore(&["page", "write", "/taken", "other"], dir.path());

    let (out, code) = run_pagestore(&["page", "move", "/draft", "/taken"], dir.path());
    assert_eq!(code, 4);
    assert_eq!(out["kind"], "already_exists");

    let (_, code) = run_pagestore(&["page", "move", "/draft", "/posts/final"], dir.path());
    assert_eq!(code, 0);

    let (out, _) = run_pagestore(&["page", "read", "/posts/final"], dir.path());
    assert_eq!(out["contents"], "text");
    let (_, code) = run_pagestore(&["page", "read", "/draft"], dir.path());
    assert_eq!(code, 3);
}

#[test]
fn test_cli_invalid_path() {
    let dir = tempdir().unwrap();

    let (out, code) = run_pagestore(&["page", "write", "/a/../b", "x"], dir.path());
    assert_eq!(code, 5);
    assert_eq!(out["kind"], "not_writable");

    let (out, code) = run_pagestore(&["page", "read", "/a//b"], dir.path());
    assert_eq!(code, 2);
    assert_eq!(out["kind"], "invalid_path");
}

// ============================================================================
// Listing Tests
// ============================================================================

#[test]
fn test_cli_list_scoped_and_ordered() {
    let dir = tempdir().unwrap();
    for path in ["/b/z", "/a/y", "/a/x"] {
        run_pagestore(&["page", "write", path, path], dir.path());
    }

    let (out, code) = run_pagestore(&["page", "list", "/a"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(out["count"], 2);
    assert_eq!(out["entries"][0]["path"], "/a/x");
    assert_eq!(out["entries"][1]["path"], "/a/y");
    assert_eq!(out["entries"][1]["contents"], "/a/y");
}

#[test]
fn test_cli_list_paths_only_with_limit() {
    let dir = tempdir().unwrap();
    for path in ["/1", "/2", "/3"] {
        run_pagestore(&["part", "write", path, "x"], dir.path());
    }

    let (out, code) = run_pagestore(&["part", "list", "--paths-only", "-l", "2"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(out["count"], 2);
    assert_eq!(out["entries"][0]["path"], "/1");
    assert!(out["entries"][0].get("contents").is_none());
}

#[test]
fn test_cli_bad_config_is_reported() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ \"compression_level\": 0 }").unwrap();

    let (out, code) = run_pagestore(&["status"], dir.path());
    assert_eq!(code, 9);
    assert_eq!(out["kind"], "config");
}
