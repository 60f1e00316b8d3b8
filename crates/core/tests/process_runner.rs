//! Process runner integration tests.
//!
//! These run real child processes through `sh` and verify:
//! - Line splitting on `\n` and `\r`
//! - Exit classification
//! - State transitions on completion, cancellation and timeout

#![cfg(unix)]

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ffconduit_core::converter::ConverterError;
use ffconduit_core::process::{ExitKind, OutputSource, ProcessRunner, RunState};

fn sh(script: &str) -> ProcessRunner {
    ProcessRunner::new("sh", vec!["-c".to_string(), script.to_string()])
}

#[tokio::test]
async fn test_stderr_lines_split_on_carriage_return() {
    let mut runner = sh(r"printf 'frame=1\rframe=2\n\nlast\n' >&2; echo ignored");
    let mut lines = Vec::new();
    let output = runner
        .run(&CancellationToken::new(), |line, _| lines.push(line.to_string()))
        .await
        .unwrap();

    assert_eq!(lines, vec!["frame=1", "frame=2", "last"]);
    assert_eq!(output.text, "frame=1\nframe=2\nlast\n");
    assert_eq!(output.exit, ExitKind::Correct);
    assert!(output.process_id > 0);
    assert_eq!(runner.state(), RunState::Completed);
}

#[tokio::test]
async fn test_stdout_capture() {
    let mut runner = sh("echo on-stderr >&2; echo on-stdout").capture(OutputSource::Stdout);
    let output = runner.run(&CancellationToken::new(), |_, _| {}).await.unwrap();
    assert_eq!(output.text, "on-stdout\n");
}

#[tokio::test]
async fn test_non_zero_exit_is_failed() {
    let mut runner = sh("echo broken >&2; exit 3");
    let output = runner.run(&CancellationToken::new(), |_, _| {}).await.unwrap();
    assert_eq!(output.exit, ExitKind::Failed { code: Some(3) });
    assert_eq!(output.text, "broken\n");
    assert_eq!(runner.state(), RunState::Completed);
}

#[tokio::test]
async fn test_runner_cannot_be_reused() {
    let mut runner = sh("true");
    runner.run(&CancellationToken::new(), |_, _| {}).await.unwrap();
    let err = runner
        .run(&CancellationToken::new(), |_, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ConverterError::AlreadyStarted));
}

#[tokio::test]
async fn test_cancellation_kills_process() {
    let mut runner = sh("echo started >&2; exec sleep 30").with_kill_grace(Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let output = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run(&cancel, |_, _| trigger.cancel()),
    )
    .await
    .expect("cancelled run should finish promptly")
    .unwrap();

    assert_eq!(output.exit, ExitKind::Killed);
    assert_eq!(runner.state(), RunState::Cancelled);
}

#[tokio::test]
async fn test_timeout() {
    let mut runner = sh("exec sleep 30")
        .with_timeout(Some(Duration::from_millis(300)))
        .with_kill_grace(Duration::from_millis(100));
    let err = runner
        .run(&CancellationToken::new(), |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(err, ConverterError::Timeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(runner.state(), RunState::Faulted);
}
