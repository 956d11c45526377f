//! CLI integration tests
//!
//! Drive the `ormstudy` binary end to end against memory and file databases.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn ormstudy(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ormstudy"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_list_prints_every_chapter() {
    let output = ormstudy(&["list"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["ch02", "ch03", "ch05", "ch06", "ch07", "ch08", "ch09", "ch10", "ch14"] {
        assert!(stdout.contains(id), "missing {} in:\n{}", id, stdout);
    }
}

#[test]
fn test_run_single_chapter_in_memory() {
    let output = ormstudy(&["run", "ch02"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("== ch02"));
    assert!(stdout.contains("members.size=2"));
}

#[test]
fn test_run_json_emits_one_report_per_chapter() {
    let output = ormstudy(&["run", "ch03", "5", "--json"]);
    assert!(output.status.success());

    let reports: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["chapter"], "ch03");
    assert_eq!(reports[1]["chapter"], "ch05");
}

#[test]
fn test_run_all_against_file_twice() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("ormstudy.db");
    let db = db_path.to_str().unwrap();

    for _ in 0..2 {
        let output = ormstudy(&["run", "--all", "--db", db]);
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    assert!(db_path.exists());
}

#[test]
fn test_run_with_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("unit.yaml");
    let db_path = temp_dir.path().join("configured.db");
    fs::write(
        &config,
        format!(
            "name: cli-test\ndatabase:\n  kind: file\n  path: {}\nshow_sql: true\n",
            db_path.display()
        ),
    )
    .unwrap();

    let output = ormstudy(&["run", "ch14", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(db_path.exists());
}

#[test]
fn test_unknown_chapter_fails() {
    let output = ormstudy(&["run", "ch99"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ch99"));
}

#[test]
fn test_bad_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("unit.yaml");
    fs::write(&config, "name: ''\n").unwrap();

    let output = ormstudy(&["run", "ch02", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_rolled_back_chapter_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("missing").join("dir").join("x.db");

    let output = ormstudy(&["run", "ch02", "ch03", "--db", db_path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ch02 rolled back:"), "stderr: {}", stderr);
    assert!(stderr.contains("rolled back: ch02, ch03"), "stderr: {}", stderr);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("== ch02"));
}
