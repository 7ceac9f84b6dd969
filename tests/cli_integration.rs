//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn apply_command() -> Command {
    let mut cmd = Command::cargo_bin("apply-command").unwrap();
    cmd.env_remove("APPLY_COMMAND_DIR");
    cmd
}

/// Binary pointed at `dir` as its command directory.
fn apply_command_in(temp: &assert_fs::TempDir, dir: &str) -> Command {
    let mut cmd = apply_command();
    cmd.current_dir(temp.path()).arg("--command-dir").arg(temp.child(dir).path());
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    apply_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("filter commands"));
}

#[test]
fn test_version_flag() {
    apply_command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_subcommand() {
    apply_command().arg("frobnicate").assert().failure();
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_seeds_missing_directory() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("sort").and(predicate::str::contains("uppercase")));

    temp.child("commands/sort.json").assert(predicate::path::exists());
    temp.close().unwrap();
}

#[test]
fn test_list_existing_directory_is_not_seeded() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("commands/rev.json").write_str(r#"{"command": "rev", "args": []}"#).unwrap();

    apply_command_in(&temp, "commands")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("rev").and(predicate::str::contains("sort").not()));

    temp.close().unwrap();
}

#[test]
fn test_list_with_json_output() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[").and(predicate::str::contains("replace-command")));

    temp.close().unwrap();
}

#[test]
fn test_list_skips_malformed_descriptor() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("commands/good.json").write_str(r#"{"command": "cat", "args": []}"#).unwrap();
    temp.child("commands/bad.json").write_str("{ not json").unwrap();

    apply_command_in(&temp, "commands")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("good").and(predicate::str::contains("Total: 1")))
        .stderr(predicate::str::contains("bad.json"));

    temp.close().unwrap();
}

// ============================================================================
// Reload & Config Tests
// ============================================================================

#[test]
fn test_reload_prints_menu() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .arg("reload")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Apply command")
                .and(predicate::str::contains("apply-command:reload-command"))
                .and(predicate::str::contains("apply-command:view-command-folder")),
        );

    temp.close().unwrap();
}

#[test]
fn test_config_display() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("command directory"));

    temp.close().unwrap();
}

#[test]
fn test_local_config_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = temp.child("from-config");
    temp.child(".apply-command.toml")
        .write_str(&format!("[general]\ncommand_directory = {:?}\n", dir.path().display()))
        .unwrap();
    dir.child("only.json").write_str(r#"{"command": "cat", "args": []}"#).unwrap();

    apply_command()
        .current_dir(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("only"));

    temp.close().unwrap();
}

#[test]
fn test_completions() {
    apply_command()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apply-command"));
}

// ============================================================================
// Apply Command Tests
// ============================================================================

#[cfg(unix)]
#[test]
fn test_apply_sorts_stdin() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "sort"])
        .write_stdin("pear\napple\nfig\n")
        .assert()
        .success()
        .stdout("apple\nfig\npear\n");

    temp.close().unwrap();
}

#[cfg(unix)]
#[test]
fn test_apply_ranges_multiplexed() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "uppercase-each", "--range", "0:3", "--range", "8:11"])
        .write_stdin("one two six ten")
        .assert()
        .success()
        .stdout("ONE two SIX ten");

    temp.close().unwrap();
}

#[cfg(unix)]
#[test]
fn test_apply_write_back() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("words.txt");
    file.write_str("b\nc\na\n").unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "sort", "--write"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("");

    file.assert("a\nb\nc\n");
    temp.close().unwrap();
}

#[test]
fn test_apply_unknown_command() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "no-such-command"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("apply-command:apply-no-such-command"));

    temp.close().unwrap();
}

#[test]
fn test_apply_missing_executable() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("commands/ghost.json")
        .write_str(r#"{"command": "definitely-not-a-real-binary-1f3a", "args": []}"#)
        .unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "ghost"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("definitely-not-a-real-binary-1f3a"));

    temp.close().unwrap();
}

#[test]
fn test_apply_bad_range() {
    apply_command().args(["apply", "sort", "--range", "3"]).assert().failure();
}

#[test]
fn test_apply_overlapping_ranges() {
    let temp = assert_fs::TempDir::new().unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "uppercase", "--range", "0:5", "--range", "3:8"])
        .write_stdin("abcdefgh")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("overlap"));

    temp.close().unwrap();
}

#[cfg(unix)]
#[test]
fn test_apply_succeeds_beside_broken_descriptor() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("commands/sort.json").write_str(r#"{"command": "sort", "args": []}"#).unwrap();
    temp.child("commands/broken.json").write_str("{ nope").unwrap();

    apply_command_in(&temp, "commands")
        .args(["apply", "sort"])
        .write_stdin("b\na\n")
        .assert()
        .success()
        .stdout("a\nb\n")
        .stderr(predicate::str::contains("broken.json"));

    temp.close().unwrap();
}
