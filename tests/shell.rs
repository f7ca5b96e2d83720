use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Runs the shell binary in `dir` with `input` piped to its standard input.
fn run_shell(dir: &Path, input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_forksh"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start forksh");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

#[test]
fn pwd_prints_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();

    let output = run_shell(&dir, "pwd\n");

    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("{}\n", dir.display()));
    assert_eq!(stderr(&output), "");
}

#[test]
fn exit_stops_reading_input() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_shell(dir.path(), "exit\nforksh-never-reached\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "");
    assert_eq!(stderr(&output), "");
}

#[test]
fn empty_lines_produce_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_shell(dir.path(), "\n   \n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "");
    assert_eq!(stderr(&output), "");
}

#[test]
fn unknown_command_is_reported_and_shell_continues() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();

    let output = run_shell(&dir, "forksh-no-such-command\npwd\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stderr(&output), "forksh-no-such-command: command not found\n");
    assert_eq!(stdout(&output), format!("{}\n", dir.display()));
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir(dir.join("inner")).unwrap();

    let output = run_shell(&dir, "cd inner\npwd\ncd a b\npwd\ncd missing\npwd\n");

    let inner = dir.join("inner");
    assert_eq!(
        stdout(&output),
        format!("{0}\n{0}\n{0}\n", inner.display())
    );
    assert_eq!(
        stderr(&output),
        "cd: too many arguments\ncd: No such file or directory\n"
    );
}

#[test]
fn external_commands_run_and_are_waited_for() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_shell(dir.path(), "/bin/sh -c 'echo first'\nsh -c \"echo second\"\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "first\nsecond\n");
    assert_eq!(stderr(&output), "");
}

#[test]
fn failed_exec_is_reported_and_shell_continues() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();
    fs::write(dir.join("notes.txt"), "not a program\n").unwrap();

    let output = run_shell(&dir, "./notes.txt\npwd\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stderr(&output), "./notes.txt: Permission denied\n");
    assert_eq!(stdout(&output), format!("{}\n", dir.display()));
}

#[test]
fn help_lists_builtins() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_shell(dir.path(), "?\n");

    assert_eq!(
        stdout(&output),
        "? - show this help menu\n\
         exit - exit the command shell\n\
         pwd - print working directory\n\
         cd - change working directory\n"
    );
}

#[test]
fn dash_prefixed_arguments_reach_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir(dir.join("-dir")).unwrap();

    let output = run_shell(&dir, "cd -dir\npwd\nexit -1\npwd\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), format!("{}\n", dir.join("-dir").display()));
    assert_eq!(stderr(&output), "");
}

#[test]
fn invalid_utf8_line_does_not_stop_the_shell() {
    let dir = tempfile::tempdir().unwrap();
    let dir = fs::canonicalize(dir.path()).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_forksh"))
        .current_dir(&dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start forksh");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"\xff\xfe\npwd\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stderr(&output), "forksh: invalid UTF-8\n");
    assert_eq!(stdout(&output), format!("{}\n", dir.display()));
}
