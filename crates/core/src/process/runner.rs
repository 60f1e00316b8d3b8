//! Child process execution with live output and cancellation.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::lines::LineSplitter;
use crate::converter::ConverterError;

/// Which pipe carries the output of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitKind {
    /// Exit code 0.
    Correct,
    /// Non-zero exit, or termination by a signal that was not ours.
    Failed { code: Option<i32> },
    /// Stopped because the run was cancelled.
    Killed,
}

/// Lifecycle of a [`ProcessRunner`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
    Faulted,
}

/// Captured output of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Every non-empty output line, newline terminated.
    pub text: String,
    pub exit: ExitKind,
    pub process_id: u32,
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

/// Runs one executable once, streaming its output line by line.
#[derive(Debug)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
    capture: OutputSource,
    timeout: Option<Duration>,
    kill_grace: Duration,
    state: RunState,
}

impl ProcessRunner {
    pub fn new(program: impl AsRef<Path>, args: Vec<String>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args,
            capture: OutputSource::Stderr,
            timeout: None,
            kill_grace: Duration::from_secs(5),
            state: RunState::NotStarted,
        }
    }

    /// Selects the pipe to read; the other one is discarded.
    pub fn capture(mut self, source: OutputSource) -> Self {
        self.capture = source;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long a graceful stop may take before the process is killed.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawns the process and feeds every output line to `on_line`.
    ///
    /// Cancelling `cancel` stops the process and yields [`ExitKind::Killed`];
    /// a token cancelled before the call fails with
    /// [`ConverterError::Cancelled`] and nothing is spawned.
    pub async fn run<F>(
        &mut self,
        cancel: &CancellationToken,
        mut on_line: F,
    ) -> Result<RunOutput, ConverterError>
    where
        F: FnMut(&str, u32),
    {
        if self.state != RunState::NotStarted {
            return Err(ConverterError::AlreadyStarted);
        }
        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        let mut child = self.spawn()?;
        self.state = RunState::Running;
        let process_id = child.id().unwrap_or(0);
        debug!(program = %self.program.display(), process_id, "Spawned process");

        let reader: Box<dyn AsyncRead + Unpin + Send> = match self.capture {
            OutputSource::Stdout => match child.stdout.take() {
                Some(out) => Box::new(out),
                None => return Err(self.fault(missing_pipe("stdout"))),
            },
            OutputSource::Stderr => match child.stderr.take() {
                Some(err) => Box::new(err),
                None => return Err(self.fault(missing_pipe("stderr"))),
            },
        };
        let mut lines = LineSplitter::new(reader);
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut text = String::new();

        let interrupt = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(Interrupt::Cancelled),
                _ = sleep_until(deadline) => break Some(Interrupt::TimedOut),
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line, process_id);
                        text.push_str(&line);
                        text.push('\n');
                    }
                    Ok(None) => break None,
                    Err(e) => {
                        let _ = child.kill().await;
                        return Err(self.fault(ConverterError::Io(e)));
                    }
                },
            }
        };

        let interrupt = match interrupt {
            Some(interrupt) => interrupt,
            None => {
                let status = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Interrupt::Cancelled),
                    _ = sleep_until(deadline) => Err(Interrupt::TimedOut),
                    status = child.wait() => Ok(status),
                };
                match status {
                    Ok(Ok(status)) => {
                        self.state = RunState::Completed;
                        return Ok(RunOutput {
                            text,
                            exit: exit_kind(status),
                            process_id,
                        });
                    }
                    Ok(Err(e)) => return Err(self.fault(ConverterError::Io(e))),
                    Err(interrupt) => interrupt,
                }
            }
        };

        terminate(&mut child, self.kill_grace).await;
        match interrupt {
            Interrupt::Cancelled => {
                debug!(process_id, "Process stopped after cancellation");
                self.state = RunState::Cancelled;
                Ok(RunOutput {
                    text,
                    exit: ExitKind::Killed,
                    process_id,
                })
            }
            Interrupt::TimedOut => {
                let timeout_secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(process_id, timeout_secs, "Process timed out");
                Err(self.fault(ConverterError::Timeout { timeout_secs }))
            }
        }
    }

    fn spawn(&mut self) -> Result<Child, ConverterError> {
        let (stdout, stderr) = match self.capture {
            OutputSource::Stdout => (Stdio::piped(), Stdio::null()),
            OutputSource::Stderr => (Stdio::null(), Stdio::piped()),
        };
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.state = RunState::Faulted;
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::ExecutableNotFound {
                        path: self.program.clone(),
                    }
                } else {
                    ConverterError::Spawn {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })
    }

    fn fault(&mut self, error: ConverterError) -> ConverterError {
        self.state = RunState::Faulted;
        error
    }
}

fn missing_pipe(name: &str) -> ConverterError {
    ConverterError::Io(std::io::Error::other(format!("{} was not captured", name)))
}

fn exit_kind(status: ExitStatus) -> ExitKind {
    if status.success() {
        ExitKind::Correct
    } else {
        ExitKind::Failed {
            code: status.code(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Asks ffmpeg to quit through its interactive `q` command, then kills the
/// process if it is still alive after `grace`. Errors are ignored: the
/// process may already be gone.
async fn terminate(child: &mut Child, grace: Duration) {
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(b"q").await;
        let _ = stdin.flush().await;
    }
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!(process_id = child.id().unwrap_or(0), "Process ignored quit request, killing");
        let _ = child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pre_cancelled_token_does_not_spawn() {
        let mut runner = ProcessRunner::new("/definitely/not/a/binary", vec![]);
        let token = CancellationToken::new();
        token.cancel();

        let err = runner.run(&token, |_, _| {}).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runner.state(), RunState::NotStarted);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let mut runner = ProcessRunner::new("/definitely/not/a/binary", vec![]);
        let err = runner
            .run(&CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ExecutableNotFound { .. }));
        assert_eq!(runner.state(), RunState::Faulted);
    }

    #[test]
    fn test_builder_defaults() {
        let runner = ProcessRunner::new("ffmpeg", vec!["-version".into()])
            .capture(OutputSource::Stdout)
            .with_timeout(Some(Duration::from_secs(3)));
        assert_eq!(runner.args(), &["-version".to_string()]);
        assert_eq!(runner.state(), RunState::NotStarted);
        assert_eq!(runner.capture, OutputSource::Stdout);
        assert_eq!(runner.kill_grace, Duration::from_secs(5));
    }
}
