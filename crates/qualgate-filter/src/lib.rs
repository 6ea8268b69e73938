//! Pure engine for qualgate: regex registry, error classifier, and the
//! bounded excerpt filter.
//!
//! This crate never launches processes: it consumes a [`ProcessResult`]
//! produced by the CLI's runner and decides (a) whether the command failed
//! and (b) which slice of its output is worth showing. Everything operates on
//! raw bytes: tool output is not guaranteed to be UTF-8, and pattern offsets
//! are byte positions.

pub mod classify;
pub mod excerpt;
pub mod registry;

use std::time::Duration;

/// Exit-code sentinel for a process terminated by its timeout.
pub const EXIT_TIMED_OUT: i32 = -1;

/// Exit-code sentinel for a process that failed to launch.
pub const EXIT_LAUNCH_FAILED: i32 = -2;

/// Exit-code sentinel for a spec that was queued but never started.
pub const EXIT_NOT_STARTED: i32 = -3;

/// The captured outcome of one subprocess, used as input to classification
/// and filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Captured stdout, bounded by the spec's capture cap.
    pub stdout: Vec<u8>,
    /// Captured stderr, bounded by the spec's capture cap.
    pub stderr: Vec<u8>,
    /// Process exit code, or one of the negative sentinels above.
    pub exit_code: i32,
    /// True when the process was terminated by its timeout.
    pub timed_out: bool,
    /// Description of a launch failure or cancellation; empty streams in
    /// that case.
    pub launch_error: Option<String>,
    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

impl ProcessResult {
    /// A result for a process that exited normally with `exit_code`.
    pub fn exited(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            timed_out: false,
            launch_error: None,
            duration: Duration::ZERO,
        }
    }

    /// A result for a spawn that never produced a process.
    pub fn launch_failure(description: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: EXIT_LAUNCH_FAILED,
            timed_out: false,
            launch_error: Some(description.into()),
            duration: Duration::ZERO,
        }
    }

    /// A result for a spec dropped from the queue before it started.
    pub fn not_started() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: EXIT_NOT_STARTED,
            timed_out: false,
            launch_error: Some("canceled before start".into()),
            duration: Duration::ZERO,
        }
    }
}

/// Join stdout and stderr into one buffer, stderr separated from stdout by a
/// single blank line. At most one trailing newline is stripped from each
/// stream so line splitting does not see a phantom empty final line.
pub fn combined_output(result: &ProcessResult) -> Vec<u8> {
    let stdout = strip_trailing_newline(&result.stdout);
    let stderr = strip_trailing_newline(&result.stderr);

    if stderr.is_empty() {
        return stdout.to_vec();
    }
    if stdout.is_empty() {
        return stderr.to_vec();
    }

    let mut buf = Vec::with_capacity(stdout.len() + stderr.len() + 2);
    buf.extend_from_slice(stdout);
    buf.extend_from_slice(b"\n\n");
    buf.extend_from_slice(stderr);
    buf
}

/// Split a buffer into LF-delimited lines (byte slices, no allocation).
pub fn split_lines(buf: &[u8]) -> Vec<&[u8]> {
    if buf.is_empty() {
        return Vec::new();
    }
    buf.split(|&b| b == b'\n').collect()
}

fn strip_trailing_newline(buf: &[u8]) -> &[u8] {
    match buf {
        [rest @ .., b'\n'] => rest,
        _ => buf,
    }
}
