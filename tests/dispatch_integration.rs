//! Dispatch Integration Tests
//!
//! Runs real filter processes over an in-memory buffer.

#![cfg(unix)]

use apply_command::core::{DispatchMode, Target};
use apply_command::{
    apply_command, ApplyError, CommandDescriptor, Editor, SubprocessRunner, TextBuffer, TextRange,
};
use tempfile::TempDir;

fn runner(temp: &TempDir) -> SubprocessRunner {
    SubprocessRunner::new(temp.path())
}

fn sh(identifier: &str, script: &str) -> CommandDescriptor {
    CommandDescriptor::new(identifier, "sh").with_args(["-c", script])
}

#[tokio::test]
async fn test_sort_whole_buffer() {
    let temp = TempDir::new().unwrap();
    let mut buf = TextBuffer::new("b\nc\na\n");

    let report = apply_command(&mut buf, &CommandDescriptor::new("sort", "sort"), &runner(&temp))
        .await;

    assert!(report.is_success());
    assert_eq!(report.completed, vec![Target::WholeBuffer]);
    assert_eq!(buf.text(), "a\nb\nc\n");
    assert_eq!(buf.undo_depth(), 1);
}

#[tokio::test]
async fn test_each_selection_gets_its_own_process() {
    let temp = TempDir::new().unwrap();
    let upper = CommandDescriptor::new("upper", "tr").with_args(["a-z", "A-Z"]);
    let mut buf = TextBuffer::new("alpha beta gamma")
        .with_selections(vec![TextRange::new(0, 5), TextRange::new(11, 16)])
        .unwrap();

    let report = apply_command(&mut buf, &upper, &runner(&temp)).await;

    assert!(report.is_success());
    assert_eq!(report.completed.len(), 2);
    assert_eq!(buf.text(), "ALPHA beta GAMMA");
}

#[tokio::test]
async fn test_growing_output_keeps_later_selections_in_place() {
    let temp = TempDir::new().unwrap();
    let double = sh("double", "x=$(cat); printf '%s%s' \"$x\" \"$x\"");
    let mut buf = TextBuffer::new("ab-cd-ef")
        .with_selections(vec![TextRange::new(0, 2), TextRange::new(6, 8)])
        .unwrap();

    let report = apply_command(&mut buf, &double, &runner(&temp)).await;

    assert!(report.is_success());
    assert_eq!(buf.text(), "abab-cd-efef");
}

#[tokio::test]
async fn test_multiplexed_single_transaction() {
    let temp = TempDir::new().unwrap();
    let upper = CommandDescriptor::new("upper-each", "tr")
        .with_args(["a-z", "A-Z"])
        .with_mode(DispatchMode::MultiplexReplace);
    let mut buf = TextBuffer::new("one two three")
        .with_selections(vec![TextRange::new(0, 3), TextRange::new(8, 13)])
        .unwrap();

    let report = apply_command(&mut buf, &upper, &runner(&temp)).await;

    assert!(report.is_success());
    assert_eq!(report.completed, vec![Target::Multiplexed]);
    assert_eq!(buf.text(), "ONE two THREE");
    assert_eq!(buf.undo_depth(), 1);

    assert!(buf.undo());
    assert_eq!(buf.text(), "one two three");
}

#[tokio::test]
async fn test_multiplexed_field_count_mismatch() {
    let temp = TempDir::new().unwrap();
    let squash = sh("squash", "tr -d '\\000'").with_mode(DispatchMode::MultiplexReplace);
    let mut buf = TextBuffer::new("x y")
        .with_selections(vec![TextRange::new(0, 1), TextRange::new(2, 3)])
        .unwrap();

    let report = apply_command(&mut buf, &squash, &runner(&temp)).await;

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].1,
        ApplyError::FragmentMismatch { expected: 2, actual: 1, .. }
    ));
    assert_eq!(buf.text(), "x y");
    assert_eq!(buf.undo_depth(), 0);
}

#[tokio::test]
async fn test_nonzero_exit_prefixes_diagnostic() {
    let temp = TempDir::new().unwrap();
    let failing = sh("failing", "echo partial; exit 2");
    let mut buf = TextBuffer::new("input");

    let report = apply_command(&mut buf, &failing, &runner(&temp)).await;

    assert!(report.is_success());
    assert_eq!(buf.text(), "Error?: cmd:sh -c echo partial; exit 2\npartial\n");
}

#[tokio::test]
async fn test_stderr_is_folded_into_output() {
    let temp = TempDir::new().unwrap();
    let noisy = sh("noisy", "cat; echo warn >&2");
    let mut buf = TextBuffer::new("body\n");

    let report = apply_command(&mut buf, &noisy, &runner(&temp)).await;

    assert!(report.is_success());
    assert!(buf.text().contains("body\n"));
    assert!(buf.text().contains("warn\n"));
}

#[tokio::test]
async fn test_missing_executable_leaves_buffer() {
    let temp = TempDir::new().unwrap();
    let ghost = CommandDescriptor::new("ghost", "definitely-not-a-real-binary-1f3a");
    let mut buf = TextBuffer::new("keep me");

    let report = apply_command(&mut buf, &ghost, &runner(&temp)).await;

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].1, ApplyError::Spawn { .. }));
    assert_eq!(buf.text(), "keep me");
}
