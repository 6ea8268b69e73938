//! The dispatch pipeline: parse → map → validate → execute → classify →
//! filter → report.
//!
//! Per-group failures are recorded and reported; only whole-invocation
//! conditions (bad event, bad config, security veto) short-circuit with
//! their dedicated exit codes.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use qualgate_common::config::{CommandSpec, Config};
use qualgate_common::{EXIT_FAILURES, EXIT_OK, Error};
use qualgate_filter::registry::RegexRegistry;
use qualgate_filter::{classify, excerpt};

use crate::executor::{self, ExecItem, ExecOptions};
use crate::output::{self, GroupReport};
use crate::security::SecurityPolicy;
use crate::{event, mapper};

/// Invocation-wide default timeout applied to specs without their own.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Dispatcher knobs resolved from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub fail_fast: bool,
    pub verbose: bool,
    /// Override of [`DEFAULT_TIMEOUT_MS`].
    pub timeout_ms: Option<u64>,
    /// Override of the default worker count.
    pub parallel: Option<usize>,
}

/// Run one full invocation for `command_name` against `event_bytes`.
///
/// Returns the process exit code on the success path (0 = all groups clean,
/// 1 = at least one group failed).
///
/// # Errors
///
/// Returns an [`Error`] whose `exit_code()` is the code to exit with: event
/// errors (3), configuration errors surfaced mid-pipeline (2), security
/// rejections (4), and internal errors (5).
pub async fn dispatch(
    command_name: &str,
    event_bytes: &[u8],
    config: &Config,
    opts: &DispatchOptions,
) -> Result<i32, Error> {
    let events = event::parse_stream(event_bytes)?;
    let files = event::extract_edited_files(&events)?;
    let invocation_dir = PathBuf::from(&events[0].cwd);

    let groups = if files.is_empty() {
        tracing::debug!("no edited files in event, running unconditionally");
        mapper::unconditional_groups(config)
    } else {
        tracing::debug!(files = files.len(), "mapping edited files to scopes");
        mapper::map_files(config, &files, &invocation_dir)?
    };

    let resolved: Vec<(String, &CommandSpec)> = groups
        .iter()
        .filter_map(|group| {
            let spec = config.resolve(group.scope, command_name)?;
            Some((group.label().to_string(), spec))
        })
        .collect();

    if resolved.is_empty() {
        if opts.verbose {
            eprintln!("[qualgate] nothing to do: no `{command_name}` command applies");
        }
        return Ok(EXIT_OK);
    }

    let policy = SecurityPolicy::from_config(config);
    for (_, spec) in &resolved {
        policy.validate(spec)?;
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(&cancel);

    let exec_opts = ExecOptions {
        parallel: opts.parallel.unwrap_or_else(executor::default_parallelism),
        fail_fast: opts.fail_fast,
        default_timeout_ms: opts.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        invocation_dir,
    };
    let items: Vec<ExecItem> = resolved
        .iter()
        .map(|(label, spec)| ExecItem {
            id: label.clone(),
            spec: (*spec).clone(),
        })
        .collect();
    let results = executor::execute(items, &exec_opts, &cancel).await;

    // One registry per invocation: compiled patterns are shared between the
    // classifier and the filter.
    let registry = RegexRegistry::new();
    let mut reports = Vec::with_capacity(results.len());
    for ((label, spec), (_, result)) in resolved.iter().zip(&results) {
        let failed = classify::classify(result, spec, &registry)?;
        let excerpt = if !failed {
            Vec::new()
        } else if let Some(description) = &result.launch_error {
            description.clone().into_bytes()
        } else {
            excerpt::filter(result, spec, &registry)?
        };
        tracing::debug!(
            group = %label,
            exit_code = result.exit_code,
            failed,
            duration_ms = result.duration.as_millis() as u64,
            "command finished"
        );
        reports.push(GroupReport {
            label: label.clone(),
            command_line: spec.display_line(),
            failed,
            excerpt,
        });
    }

    output::render(&reports, opts.verbose, &mut std::io::stderr().lock())
        .map_err(|e| Error::Internal(format!("cannot write report: {e}")))?;

    if reports.iter().any(|r| r.failed) {
        Ok(EXIT_FAILURES)
    } else {
        Ok(EXIT_OK)
    }
}

/// Cancel the invocation on Ctrl-C; the executor cascades the token to every
/// in-flight runner.
fn spawn_interrupt_listener(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, canceling in-flight commands");
            cancel.cancel();
        }
    });
}
