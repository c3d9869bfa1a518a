use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn gitlinks_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gitlinks"));
    cmd.current_dir(dir);
    cmd.env_remove("GITLINKS_LOG");
    cmd
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok_and(|o| o.status.success())
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com", "-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_CEILING_DIRECTORIES", dir.parent().unwrap())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn translate_deletion_from_diff_file() {
    let after = gitlinks_cmd(&fixtures()).args(["translate", "--diff", "deletion.diff", "--old", "5"]).output().unwrap();
    assert!(after.status.success(), "{}", String::from_utf8_lossy(&after.stderr));
    assert_eq!(stdout(&after), "4,4,1\n");

    let inside = gitlinks_cmd(&fixtures()).args(["translate", "--diff", "deletion.diff", "--old", "4"]).output().unwrap();
    assert_eq!(stdout(&inside), "3,3,0\n");
}

#[test]
fn translate_reads_diff_from_stdin() {
    let diff = std::fs::read_to_string(fixtures().join("modification.diff")).unwrap();
    let mut child = gitlinks_cmd(&fixtures())
        .args(["translate", "--new", "5"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(diff.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "4,5,2\n");
}

#[test]
fn translate_json_output() {
    let output = gitlinks_cmd(&fixtures())
        .args(["translate", "--diff", "modification.diff", "--old", "4", "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value, serde_json::json!({ "end": 6, "span": 3, "start": 4 }));
}

#[test]
fn translate_needs_a_query() {
    let output = gitlinks_cmd(&fixtures()).args(["translate", "--diff", "deletion.diff"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn translate_rejects_line_zero() {
    let output = gitlinks_cmd(&fixtures()).args(["translate", "--diff", "deletion.diff", "--new", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid Line"));
}

#[test]
fn links_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = gitlinks_cmd(dir.path())
        .arg("links")
        .env("GIT_CEILING_DIRECTORIES", dir.path().parent().unwrap())
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn links_and_trace_in_repository() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir(root.join("src")).unwrap();
    std::fs::write(root.join("src/lib.rs"), "one\ntwo\nthree\n").unwrap();
    git(root, &["init", "-q"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "init"]);
    git(root, &["branch", "feature"]);
    git(root, &["tag", "feature"]);

    let mut child = gitlinks_cmd(root)
        .args(["links", "--format", "json"])
        .env("GIT_CEILING_DIRECTORIES", root.parent().unwrap())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"see src/lib.rs on feature\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let records: Vec<serde_json::Value> =
        stdout(&output).lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["start_index"], 4);
    assert_eq!(records[0]["candidates"][0]["payload"]["type"], "file");
    assert_eq!(records[1]["start_index"], 18);
    let kinds: Vec<&str> = records[1]["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["payload"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["local_branch", "tag"]);

    // A new first line in the work tree pushes line 2 down from HEAD's line 1.
    std::fs::write(root.join("src/lib.rs"), "zero\none\ntwo\nthree\n").unwrap();
    let output = gitlinks_cmd(root)
        .args(["trace", "src/lib.rs", "2"])
        .env("GIT_CEILING_DIRECTORIES", root.parent().unwrap())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("worktree") && lines[0].ends_with("2,2,1"));
    assert!(lines[1].starts_with("index") && lines[1].ends_with("1,1,1"));
    assert!(lines[2].starts_with("HEAD") && lines[2].ends_with("1,1,1"));

    // An unsaved buffer with one more line on top; git diff --no-index exits 1 here.
    let scratch = tempfile::tempdir().unwrap();
    let buffer = scratch.path().join("unsaved.rs");
    std::fs::write(&buffer, "new\nzero\none\ntwo\nthree\n").unwrap();
    let output = gitlinks_cmd(root)
        .args(["trace", "src/lib.rs", "3", "--buffer"])
        .arg(&buffer)
        .env("GIT_CEILING_DIRECTORIES", root.parent().unwrap())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("buffer") && lines[0].ends_with("3,3,1"));
    assert!(lines[1].starts_with("worktree") && lines[1].ends_with("2,2,1"));
    assert!(lines[2].starts_with("index") && lines[2].ends_with("1,1,1"));
    assert!(lines[3].starts_with("HEAD") && lines[3].ends_with("1,1,1"));
}

#[test]
fn links_survive_non_utf8_input() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("README.md"), "hello\n").unwrap();
    git(root, &["init", "-q"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "init"]);

    let mut child = gitlinks_cmd(root)
        .args(["links", "--format", "json"])
        .env("GIT_CEILING_DIRECTORIES", root.parent().unwrap())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"caf\xe9 latin1 line\nsee README.md\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let records: Vec<serde_json::Value> =
        stdout(&output).lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["line"], 2);
    assert_eq!(records[0]["start_index"], 4);
    assert_eq!(records[0]["candidates"][0]["payload"]["path"], "README.md");
}
