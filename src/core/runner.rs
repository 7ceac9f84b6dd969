//! Process runner.
//!
//! Spawns a filter command, feeds it the input text on stdin, and collects
//! stdout and stderr into one string in the order chunks arrive.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command as ProcessCommand};

use super::descriptor::CommandDescriptor;
use super::error::{ApplyError, ApplyResult};

const READ_CHUNK: usize = 8192;

/// Output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Combined stdout and stderr, with a diagnostic line prepended on failure
    pub output: String,

    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Check if the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one descriptor against one input text.
///
/// Implementations must not block the calling task; completion is delivered
/// through the returned future.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `descriptor` with `input` on stdin.
    async fn run(&self, descriptor: &CommandDescriptor, input: &str)
        -> ApplyResult<ExecutionResult>;
}

/// The diagnostic line prepended to the output of a failed command.
pub fn diagnostic_line(descriptor: &CommandDescriptor) -> String {
    format!("Error?: cmd:{} {}", descriptor.executable, descriptor.arguments.join(" "))
}

/// Runs descriptors as real child processes.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    /// Working directory for every child
    working_dir: PathBuf,
}

impl SubprocessRunner {
    /// Create a runner whose children start in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self { working_dir: working_dir.into() }
    }

    /// The working directory children are started in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(
        &self,
        descriptor: &CommandDescriptor,
        input: &str,
    ) -> ApplyResult<ExecutionResult> {
        tracing::debug!(
            command = %descriptor.command_line(),
            bytes = input.len(),
            "Spawning filter command"
        );

        let mut cmd = ProcessCommand::new(&descriptor.executable);
        cmd.args(&descriptor.arguments)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ApplyError::Spawn {
            command: descriptor.executable.clone(),
            source: e,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Write and read concurrently so a child that fills its pipes
        // before draining stdin cannot deadlock us.
        let (written, collected) =
            tokio::join!(write_input(stdin, input.as_bytes()), collect_output(stdout, stderr));
        written?;
        let collected = collected?;

        let status = child.wait().await?;
        let mut output = String::from_utf8_lossy(&collected).into_owned();

        if !status.success() {
            tracing::debug!(
                command = %descriptor.command_line(),
                code = ?status.code(),
                "Filter command exited with failure"
            );
            output.insert_str(0, &format!("{}\n", diagnostic_line(descriptor)));
        }

        Ok(ExecutionResult { output, exit_code: status.code() })
    }
}

/// Write all of `input` and close stdin. A child that exits without reading
/// its input is not an error.
async fn write_input(stdin: Option<ChildStdin>, input: &[u8]) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    match stdin.write_all(input).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            tracing::debug!("Child closed stdin before reading all input");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    match stdin.shutdown().await {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

enum Chunk {
    Stdout(std::io::Result<usize>),
    Stderr(std::io::Result<usize>),
}

/// Read both pipes until EOF, appending chunks in arrival order.
async fn collect_output(
    mut stdout: Option<ChildStdout>,
    mut stderr: Option<ChildStderr>,
) -> std::io::Result<Vec<u8>> {
    let mut collected = Vec::new();
    let mut out_buf = vec![0u8; READ_CHUNK];
    let mut err_buf = vec![0u8; READ_CHUNK];

    loop {
        let chunk = tokio::select! {
            n = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => Chunk::Stdout(n),
            n = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => Chunk::Stderr(n),
            else => break,
        };

        match chunk {
            Chunk::Stdout(n) => match n? {
                0 => stdout = None,
                n => collected.extend_from_slice(&out_buf[..n]),
            },
            Chunk::Stderr(n) => match n? {
                0 => stderr = None,
                n => collected.extend_from_slice(&err_buf[..n]),
            },
        }
    }

    Ok(collected)
}

async fn read_chunk<R>(reader: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
