/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary and verify command-line behavior
mod common;

use assert_cmd::Command;

use common::{sample_store, transcript_line, write_transcript};
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary pointed at an isolated home and data directory
fn chatfs(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chatfs"));
    cmd.env("HOME", home.path())
        .env_remove("CHATFS_DATA_DIR")
        .env_remove("RUST_LOG")
        .env_remove("XDG_CONFIG_HOME")
        .arg("--data-dir")
        .arg(home.path().join("data"));
    cmd
}

fn seeded_home() -> TempDir {
    let home = TempDir::new().unwrap();
    drop(sample_store().file_store(&home.path().join("data").join("conversations")));
    home
}

#[test]
fn test_cli_help_flag() {
    Command::new(env!("CARGO_BIN_EXE_chatfs"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("virtual filesystem"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("import-claude"));
}

#[test]
fn test_cli_version_flag() {
    Command::new(env!("CARGO_BIN_EXE_chatfs"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    Command::new(env!("CARGO_BIN_EXE_chatfs"))
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_no_command_prints_hint() {
    let home = TempDir::new().unwrap();
    chatfs(&home)
        .assert()
        .success()
        .stdout(predicate::str::contains("Use --help for usage information"));
}

#[test]
fn test_cli_exec_runs_one_line() {
    let home = seeded_home();
    chatfs(&home)
        .args(["exec", "ls /chats | grep abc1"])
        .assert()
        .success()
        .stdout("abc123/\n");
}

#[test]
fn test_cli_exec_propagates_exit_code() {
    let home = seeded_home();
    chatfs(&home)
        .args(["exec", "nosuch"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("nosuch: unknown command"));

    chatfs(&home).args(["exec", "ls -z"]).assert().code(2);
    chatfs(&home).args(["exec", "echo 'open"]).assert().code(2);
}

#[test]
fn test_cli_ls_subcommand() {
    let home = seeded_home();
    chatfs(&home)
        .args(["ls", "/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chats/"))
        .stdout(predicate::str::contains("recent/"));

    chatfs(&home)
        .args(["ls", "/starred"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123/"))
        .stdout(predicate::str::contains("Rust lifetimes"));
}

#[test]
fn test_cli_ls_missing_path_fails() {
    let home = seeded_home();
    chatfs(&home)
        .args(["ls", "/chats/zzz999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such file or directory"));
}

#[test]
fn test_cli_stats_command_with_data() {
    let home = seeded_home();
    chatfs(&home)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversation Store Statistics"))
        .stdout(predicate::str::contains("Conversations: 2"))
        .stdout(predicate::str::contains("Starred: 1"))
        .stdout(predicate::str::contains("Messages: 8"));
}

#[test]
fn test_cli_stats_empty_store() {
    let home = TempDir::new().unwrap();
    chatfs(&home)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversations: 0"));
}

#[test]
fn test_cli_shell_reads_stdin() {
    let home = seeded_home();
    chatfs(&home)
        .arg("shell")
        .write_stdin("cd /chats\npwd\ncd abc9\necho $CONV\nexit\npwd\n")
        .assert()
        .success()
        .stdout("/chats\nabc999\n");
}

#[test]
fn test_cli_shell_returns_last_exit_code() {
    let home = seeded_home();
    chatfs(&home).arg("shell").write_stdin("pwd\nnosuch\n").assert().code(127);
}

#[test]
fn test_cli_shell_changes_persist() {
    let home = seeded_home();
    chatfs(&home)
        .arg("shell")
        .write_stdin("rm /chats/abc999\nconfirm\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted abc999"));

    chatfs(&home)
        .args(["exec", "ls /chats"])
        .assert()
        .success()
        .stdout("abc123/\n");
}

#[test]
fn test_cli_import_claude() {
    let home = TempDir::new().unwrap();
    let projects = TempDir::new().unwrap();
    let session = "550e8400-e29b-41d4-a716-446655440000";
    write_transcript(
        projects.path(),
        "-Users-test-app/session.jsonl",
        &[
            transcript_line(session, "user", "u1", None, 1_000, "hello"),
            transcript_line(session, "assistant", "a1", Some("u1"), 2_000, "hi there"),
        ],
    );

    chatfs(&home)
        .arg("import-claude")
        .arg(projects.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files parsed: 1"))
        .stdout(predicate::str::contains("Conversations: 1"))
        .stdout(predicate::str::contains("Messages: 2"));

    chatfs(&home)
        .args(["exec", "ls /source/claude-code"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}/\n", session)));
}

#[test]
fn test_cli_import_missing_directory() {
    let home = TempDir::new().unwrap();
    chatfs(&home)
        .arg("import-claude")
        .arg(home.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import directory not found"));
}
