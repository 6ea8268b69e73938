//! Bounded, error-centric excerpts of captured output.
//!
//! The excerpt keeps the lines an engineer (or the host assistant) actually
//! needs: lines matched by the spec's error or include patterns, expanded by
//! the configured context window, with elided stretches summarized in place.
//! When nothing matches, the head of the output is shown instead so a failing
//! command is never reported silently.

use regex::bytes::Regex;
use std::sync::Arc;

use qualgate_common::Error;
use qualgate_common::config::CommandSpec;

use crate::registry::RegexRegistry;
use crate::{ProcessResult, combined_output, split_lines};

/// Line cap for the no-match head fallback.
pub const HEAD_LINE_LIMIT: usize = 200;

const TRUNCATED_MARKER: &[u8] = b"... (output truncated) ...";
const NO_MATCH_HEADER: &[u8] = b"... (no error pattern matched; showing head) ...";

/// Produce the bounded excerpt for `result` under `spec`.
///
/// # Errors
///
/// Returns [`Error::Config`] if a pattern fails to compile; unreachable for
/// specs that passed load-time validation.
pub fn filter(
    result: &ProcessResult,
    spec: &CommandSpec,
    registry: &RegexRegistry,
) -> Result<Vec<u8>, Error> {
    let buffer = combined_output(result);
    let lines = split_lines(&buffer);

    let patterns: Vec<Arc<Regex>> = spec
        .error_patterns
        .iter()
        .chain(&spec.include_patterns)
        .map(|p| registry.compile(p))
        .collect::<Result<_, _>>()?;

    let matched: Vec<bool> = lines
        .iter()
        .map(|line| patterns.iter().any(|re| re.is_match(line)))
        .collect();

    if !matched.contains(&true) {
        return Ok(head_fallback(&lines, spec.max_output));
    }

    let selected = expand_context(&matched, spec.context_lines);
    let rendered = render_selected(&lines, &selected);
    Ok(assemble(&rendered, spec.max_output))
}

/// Union of `context` lines around every matched line.
fn expand_context(matched: &[bool], context: usize) -> Vec<bool> {
    let mut selected = vec![false; matched.len()];
    for (i, &hit) in matched.iter().enumerate() {
        if !hit {
            continue;
        }
        let start = i.saturating_sub(context);
        let end = (i + context).min(matched.len().saturating_sub(1));
        for slot in &mut selected[start..=end] {
            *slot = true;
        }
    }
    selected
}

/// Selected lines in original order, with a one-line elision marker between
/// non-adjacent selections.
fn render_selected(lines: &[&[u8]], selected: &[bool]) -> Vec<Vec<u8>> {
    let mut rendered = Vec::new();
    let mut last_kept: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        if !selected[i] {
            continue;
        }
        if let Some(prev) = last_kept
            && i > prev + 1
        {
            let omitted = i - prev - 1;
            rendered.push(format!("... ({omitted} lines omitted) ...").into_bytes());
        }
        rendered.push(line.to_vec());
        last_kept = Some(i);
    }
    rendered
}

fn head_fallback(lines: &[&[u8]], max_output: usize) -> Vec<u8> {
    let mut rendered = Vec::with_capacity(HEAD_LINE_LIMIT + 1);
    rendered.push(NO_MATCH_HEADER.to_vec());
    for line in lines.iter().take(HEAD_LINE_LIMIT) {
        rendered.push(line.to_vec());
    }
    assemble(&rendered, max_output)
}

/// Join rendered lines with LF, enforcing the byte cap. Truncation keeps
/// whole lines only and the truncation marker is counted inside the cap, so
/// the returned excerpt never exceeds it.
fn assemble(rendered: &[Vec<u8>], max_output: usize) -> Vec<u8> {
    let total: usize = rendered.iter().map(|l| l.len() + 1).sum::<usize>().saturating_sub(1);
    if max_output == 0 || total <= max_output {
        return rendered.join(&b'\n');
    }

    // After any kept line the marker needs its own newline.
    let marker_cost = 1 + TRUNCATED_MARKER.len();
    let mut out: Vec<u8> = Vec::with_capacity(max_output);
    for line in rendered {
        let newline = usize::from(!out.is_empty());
        if out.len() + newline + line.len() + marker_cost > max_output {
            break;
        }
        if newline == 1 {
            out.push(b'\n');
        }
        out.extend_from_slice(line);
    }
    if !out.is_empty() {
        out.push(b'\n');
    }
    out.extend_from_slice(TRUNCATED_MARKER);
    out
}
