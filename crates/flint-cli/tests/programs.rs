use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

fn workspace_root() -> PathBuf {
    // crates/flint-cli sits two levels below the workspace root
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root")
        .to_path_buf()
}

/// Compile `source`, link it, run the produced executable and return its
/// exit status.
fn compile_and_run(source: &str) -> i32 {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("prog.flint");
    std::fs::write(&src_path, source).unwrap();
    let exe_path = dir.path().join("prog");

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&src_path).arg("-o").arg(&exe_path);
    cmd.assert().success();

    let status = Command::new(&exe_path).status().unwrap();
    status.code().expect("program exited with a status")
}

#[test]
fn returns_a_constant() {
    assert_eq!(compile_and_run("define main() { return 42; }"), 42);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        compile_and_run("define main() { let a = 2; let b = 3; return a + b * 4; }"),
        14
    );
    assert_eq!(compile_and_run("define main() { return 1 + 2 * 3; }"), 7);
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(compile_and_run("define main() { return (1 + 2) * 3; }"), 9);
}

#[test]
fn modulo_takes_the_remainder() {
    assert_eq!(compile_and_run("define main() { return 5 % 2; }"), 1);
}

#[test]
fn subtraction_is_left_associative() {
    assert_eq!(compile_and_run("define main() { return 10 - 4 - 3; }"), 3);
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(compile_and_run("define main() { return 2 > 1; }"), 1);
    assert_eq!(compile_and_run("define main() { return 1 > 2; }"), 0);
}

#[test]
fn arguments_pass_through_registers() {
    assert_eq!(
        compile_and_run(
            "define add(x; y) { return x + y; } define main() { return add(20; 22); }"
        ),
        42
    );
}

#[test]
fn while_loop_accumulates() {
    assert_eq!(
        compile_and_run(
            "define main() { let i = 0; let s = 0; \
             while (i < 5) { s = s + i; i = i + 1; } return s; }"
        ),
        10
    );
}

#[test]
fn if_else_takes_the_true_branch() {
    assert_eq!(
        compile_and_run("define main() { if (1 == 1) { return 7; } else { return 9; } }"),
        7
    );
}

#[test]
fn recursion_computes_factorial() {
    assert_eq!(
        compile_and_run(
            "define fact(n) { if (n < 2) { return 1; } else { return n * fact(n - 1); } } \
             define main() { return fact(5); }"
        ),
        120
    );
}

#[test]
fn value_block_return_leaves_the_function() {
    assert_eq!(
        compile_and_run("define main() { let x = { return 2; }; return x; }"),
        2
    );
}

#[test]
fn exit_statement_ends_the_process() {
    assert_eq!(
        compile_and_run("define main() { if (1) { exit 7; } return 0; }"),
        7
    );
}

#[test]
fn runs_factorial_demo() {
    let demo = workspace_root().join("demos/factorial.flint");
    let dir = tempfile::tempdir().unwrap();
    let exe_path = dir.path().join("factorial");

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&demo).arg("-o").arg(&exe_path);
    cmd.assert().success();

    let status = Command::new(&exe_path).status().unwrap();
    assert_eq!(status.code(), Some(120));
}

#[test]
fn emit_asm_stops_before_assembling() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("prog.flint");
    std::fs::write(&src_path, "define main() { return 0; }").unwrap();
    let exe_path = dir.path().join("prog");

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&src_path).arg("-o").arg(&exe_path).arg("--emit-asm");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("prog.s"));

    let asm = std::fs::read_to_string(dir.path().join("prog.s")).unwrap();
    assert!(asm.contains("_start:"));
    assert!(!exe_path.exists());
}

#[test]
fn undeclared_variable_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("bad.flint");
    std::fs::write(&src_path, "define main() { return y; }").unwrap();

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&src_path).arg("-o").arg(dir.path().join("bad"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Undeclared variable 'y'"));
}

#[test]
fn parse_error_is_nonzero() {
    let bad = "define main( {\n"; // malformed on purpose
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("bad.flint");
    std::fs::write(&src_path, bad).unwrap();

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&src_path).arg("-o").arg(dir.path().join("bad"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn missing_input_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(dir.path().join("nope.flint"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn top_level_statement_warns_but_compiles() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("prog.flint");
    std::fs::write(&src_path, "let x = 1; define main() { return 3; }").unwrap();
    let exe_path = dir.path().join("prog");

    let mut cmd = Command::cargo_bin("flint-cli").unwrap();
    cmd.arg(&src_path).arg("-o").arg(&exe_path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("warning"));

    let status = Command::new(&exe_path).status().unwrap();
    assert_eq!(status.code(), Some(3));
}
