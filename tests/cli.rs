//! Integration tests for the lambdasheet binary.

use std::io::Write;
use std::process::{Command, Stdio};

fn run_with_stdin(args: &[&str], stdin: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lambdasheet"))
        // Tests must not depend on a user's ~/.config/lambdasheet/config.toml.
        .arg("--no-config")
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn run_command(args: &[&str]) -> (String, String, i32) {
    run_with_stdin(args, "")
}

#[test]
fn test_range_sum() {
    let (stdout, _, code) = run_command(&[
        "-c",
        "A1=2",
        "-c",
        "A2=2",
        "-c",
        "A3=2",
        "-c",
        "A4=lambda: sum(s[a1:a3])",
    ]);
    assert_eq!(stdout, "A1\t2.0\nA2\t2.0\nA3\t2.0\nA4\t6.0\n");
    assert_eq!(code, 0);
}

#[test]
fn test_formula_failure_exit_code() {
    let (stdout, _, code) = run_command(&["-c", "a1=2", "-c", "a2=lambda: sum(a1)"]);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "A1\t2.0");
    assert!(lines[1].starts_with("A2\tRuntime error: "));
    assert_eq!(code, 1);
}

#[test]
fn test_formulas_do_not_see_formulas() {
    let (stdout, _, code) = run_command(&["-c", "A1=lambda: 1", "-c", "A2=lambda: a1 + 1"]);
    assert_eq!(stdout, "A1\t1.0\nA2\tUnknown symbol: a1\n");
    assert_eq!(code, 1);
}

#[test]
fn test_json_output() {
    let (stdout, _, code) = run_command(&["--json", "-c", "B2=lambda: 7 // 2"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"column": "B", "row": 2, "input": "lambda: 7 // 2", "output": "3.0"}
        ])
    );
    assert_eq!(code, 0);
}

#[test]
fn test_stdin_triples() {
    let (stdout, _, code) = run_with_stdin(&[], "a\t1\t1.5\nb\t1\tlambda: a1 * 2\nc\t1\tnote\n");
    assert_eq!(stdout, "A1\t1.5\nB1\t3.0\nC1\tnote\n");
    assert_eq!(code, 0);
}

#[test]
fn test_out_of_range_names_item() {
    let (stdout, stderr, code) = run_command(&["-c", "A1=1", "-c", "Z1=1"]);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error while adding cell #1: Column out of range (A-Z)"));
    assert_eq!(code, 1);
}

#[test]
fn test_bound_overrides() {
    let (stdout, _, code) = run_command(&["--columns", "27", "-c", "Z1=1"]);
    assert_eq!(stdout, "Z1\t1.0\n");
    assert_eq!(code, 0);
}

#[test]
fn test_config_file_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[sheet]\nmax_rows = 5\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_lambdasheet"))
        .args(["--config", config.to_str().unwrap(), "-c", "A5=1"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(status.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&status.stderr).contains("Row out of range (1-5)"));
}

#[test]
fn test_tsv_file_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.tsv");
    let output = dir.path().join("output.tsv");
    std::fs::write(&input, "\tA\tB\n1\t1\tlambda: a1 + a2\n2\t2\tx\n").unwrap();

    let (stdout, _, code) = run_command(&[
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    assert_eq!(stdout, "A1\t1.0\nB1\t3.0\nA2\t2.0\nB2\tx\n");
    assert_eq!(code, 0);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "\tA\tB\n1\t1.0\t3.0\n2\t2.0\tx\n"
    );
}

#[test]
fn test_help_and_bad_options() {
    let (_, stderr, code) = run_command(&["--help"]);
    assert!(stderr.starts_with("Usage: lambdasheet"));
    assert_eq!(code, 0);

    let (_, stderr, code) = run_command(&["--frobnicate"]);
    assert!(stderr.contains("Unknown option: --frobnicate"));
    assert_eq!(code, 1);
}
