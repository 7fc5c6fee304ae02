//! Black-box tests for the `corvusc` binary: argument parsing, exit codes,
//! and the single-line diagnostic contract.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn corvusc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_corvusc"))
}

fn source_file(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile");
    f.write_all(content.as_bytes()).expect("write source");
    f
}

#[test]
fn help_lists_emit_flags() {
    corvusc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--emit-ir"));
}

#[test]
fn version_flag_succeeds() {
    corvusc().arg("--version").assert().success();
}

#[test]
fn valid_source_exits_zero_with_no_output() {
    let f = source_file("fn main() -> i32 { return 0; }");
    corvusc()
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn emit_ir_prints_ir_text_on_stdout() {
    let f = source_file("fn main() -> i32 { return 1 + 1; }");
    corvusc()
        .arg(f.path())
        .arg("--emit-ir")
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));
}

#[test]
fn syntax_error_exits_one_with_single_line_diagnostic() {
    let f = source_file("fn main( { }");
    let output = corvusc().arg(f.path()).assert().failure().get_output().clone();

    let stderr = String::from_utf8(output.stderr).unwrap();
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 1, "expected exactly one diagnostic line, got: {:?}", lines);
    assert!(lines[0].starts_with("error: "), "{}", lines[0]);
    assert!(lines[0].contains(" at "), "{}", lines[0]);
}

#[test]
fn missing_file_exits_one() {
    corvusc()
        .arg("/nonexistent/path/does-not-exist.corvus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn conflicting_emit_flags_are_rejected() {
    let f = source_file("fn main() -> i32 { return 0; }");
    corvusc()
        .arg(f.path())
        .arg("--emit-ir")
        .arg("--emit-lir")
        .assert()
        .failure();
}

#[test]
fn no_opt_still_compiles_successfully() {
    let f = source_file("fn main() -> i32 { return 2 + 2; }");
    corvusc()
        .arg(f.path())
        .arg("--no-opt")
        .assert()
        .success();
}
