//! Shared subprocess handling for the nodetool client.
//!
//! [`capture`] runs a short listing command to completion and returns its
//! stdout. [`stream`] runs a long repair, forwarding every output line to
//! the log as it arrives and enforcing an optional time limit.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::Instrument;

use super::ToolError;

/// Longest stderr excerpt carried inside a [`ToolError::NonZeroExit`].
const MAX_DETAIL_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Run `cmd` to completion and return its stdout.
///
/// A non-zero exit becomes [`ToolError::NonZeroExit`] carrying the process's
/// stderr (or stdout, when stderr is empty).
pub(crate) async fn capture(
    cmd: &mut Command,
    program: &str,
    command_line: &str,
) -> Result<String, ToolError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %command_line, "Running administrative query");

    let output = cmd.output().await.map_err(|e| spawn_error(program, e))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        return Err(ToolError::NonZeroExit {
            command: command_line.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            detail: truncate(detail),
        });
    }

    Ok(stdout)
}

/// Run `cmd`, logging stdout lines at `info` and stderr lines at `warn`
/// while it runs.
///
/// When `timeout` elapses the child is killed and
/// [`ToolError::Timeout`] is returned.
pub(crate) async fn stream(
    cmd: &mut Command,
    program: &str,
    command_line: &str,
    timeout: Option<Duration>,
) -> Result<(), ToolError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| spawn_error(program, e))?;

    // Readers run as separate tasks so `child.wait()` can borrow the child.
    let stdout_task =
        tokio::spawn(forward_lines(child.stdout.take(), OutputStream::Stdout).in_current_span());
    let stderr_task =
        tokio::spawn(forward_lines(child.stderr.take(), OutputStream::Stderr).in_current_span());

    let waited = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    let Some(status) = waited else {
        if let Err(e) = child.kill().await {
            tracing::warn!(command = %command_line, error = %e, "Failed to kill timed-out process");
        }
        // Grandchildren may still hold the pipes open; stop reading.
        stdout_task.abort();
        stderr_task.abort();
        return Err(ToolError::Timeout {
            command: command_line.to_string(),
            elapsed: start.elapsed(),
        });
    };

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let status = status.map_err(|source| ToolError::Io {
        command: command_line.to_string(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(ToolError::NonZeroExit {
            command: command_line.to_string(),
            exit_code: status.code().unwrap_or(-1),
            detail: String::new(),
        })
    }
}

/// Forward each line of `handle` to the log until EOF.
///
/// Lines are decoded lossily so that stray non-UTF-8 bytes never stop the
/// pipe from being drained.
async fn forward_lines<R>(handle: Option<R>, stream: OutputStream)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(handle) = handle else {
        return;
    };
    let mut reader = BufReader::new(handle);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                match stream {
                    OutputStream::Stdout => tracing::info!(stream = "stdout", "{line}"),
                    OutputStream::Stderr => tracing::warn!(stream = "stderr", "{line}"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read process output");
                break;
            }
        }
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> ToolError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotFound {
            program: program.to_string(),
        }
    } else {
        ToolError::Spawn {
            program: program.to_string(),
            source: err,
        }
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
