//! Subprocess launch, bounded capture, timeout, and termination.
//!
//! One call to [`run`] spawns exactly one process and reaps it exactly once.
//! The child gets its own process group (via `setsid`) so timeout and
//! cancellation can terminate the whole tree, and both output pipes are
//! drained past the capture cap so a chatty child never blocks on pipe
//! back-pressure.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use qualgate_common::config::CommandSpec;
use qualgate_filter::{EXIT_TIMED_OUT, ProcessResult};

/// How long a terminated process gets to exit before the kill escalates.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8192;

enum WaitOutcome {
    Exited(i32),
    TimedOut,
    Canceled,
}

/// Run one validated spec to completion.
///
/// The working directory defaults to `invocation_dir`; the timeout defaults
/// to `default_timeout_ms` when the spec does not set its own. Launch
/// failures are reported in-band on the result, never as a panic or an
/// early return.
pub async fn run(
    spec: &CommandSpec,
    default_timeout_ms: u64,
    invocation_dir: &Path,
    cancel: &CancellationToken,
) -> ProcessResult {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    match spec.working_dir.as_deref() {
        Some(dir) => cmd.current_dir(dir),
        None => cmd.current_dir(invocation_dir),
    };

    // Own process group, so group-targeted signals reach grandchildren too.
    // SAFETY: pre_exec runs after fork and before exec in the child.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::other)?;
            Ok(())
        });
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let mut result =
                ProcessResult::launch_failure(format!("failed to spawn `{}`: {e}", spec.command));
            result.duration = start.elapsed();
            return result;
        }
    };

    let cap = spec.capture_cap();
    let stdout_task = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, cap)));
    let stderr_task = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, cap)));

    let timeout = Duration::from_millis(spec.timeout_ms.unwrap_or(default_timeout_ms));
    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => WaitOutcome::Exited(exit_code_from_status(status)),
            Err(_) => WaitOutcome::Exited(-1),
        },
        () = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
        () = cancel.cancelled() => WaitOutcome::Canceled,
    };

    if !matches!(outcome, WaitOutcome::Exited(_)) {
        terminate_then_kill(&mut child).await;
    }

    let stdout = join_capture(stdout_task).await;
    let stderr = join_capture(stderr_task).await;

    let (exit_code, timed_out, launch_error) = match outcome {
        WaitOutcome::Exited(code) => (code, false, None),
        WaitOutcome::TimedOut => (EXIT_TIMED_OUT, true, None),
        WaitOutcome::Canceled => (EXIT_TIMED_OUT, false, Some("canceled".to_string())),
    };

    ProcessResult {
        stdout,
        stderr,
        exit_code,
        timed_out,
        launch_error,
        duration: start.elapsed(),
    }
}

/// Map a wait status to an exit code, with signals as 128+N on Unix.
fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

/// Drain a pipe to EOF, keeping at most `cap` bytes. Bytes past the cap are
/// read and discarded so the child never blocks; a sentinel line records how
/// much was dropped.
async fn read_capped<R: tokio::io::AsyncRead + Unpin>(mut reader: R, cap: usize) -> Vec<u8> {
    let mut captured: Vec<u8> = Vec::new();
    let mut discarded: usize = 0;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let keep = cap.saturating_sub(captured.len()).min(n);
                captured.extend_from_slice(&chunk[..keep]);
                discarded += n - keep;
            }
        }
    }

    if discarded > 0 {
        if !captured.is_empty() && !captured.ends_with(b"\n") {
            captured.push(b'\n');
        }
        captured.extend_from_slice(format!("... ({discarded} bytes truncated) ...").as_bytes());
    }
    captured
}

async fn join_capture(task: Option<tokio::task::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}

/// SIGTERM the child's process group, wait out the grace period, then
/// SIGKILL and reap.
async fn terminate_then_kill(child: &mut Child) {
    signal_group(child, Signal::Term);
    if tokio::time::timeout(GRACE_PERIOD, child.wait()).await.is_err() {
        signal_group(child, Signal::Kill);
        let _ = child.wait().await;
    }
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(child: &mut Child, signal: Signal) {
    let Some(pid) = child.id() else {
        return; // already reaped
    };
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    let signal = match signal {
        Signal::Term => nix::sys::signal::Signal::SIGTERM,
        Signal::Kill => nix::sys::signal::Signal::SIGKILL,
    };
    // Negative pid: the whole group created by setsid.
    let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(-pid), signal);
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, _signal: Signal) {
    // No process groups; best effort on the direct child.
    let _ = child.start_kill();
}
