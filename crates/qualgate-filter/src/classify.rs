//! Success/failure verdict for one process result.
//!
//! Rules are evaluated in a fixed order and the first conclusive rule wins:
//!
//! 1. timeout → failure
//! 2. launch error → failure
//! 3. exit-code rule: an absent `exitCodes` means any non-zero exit fails; an
//!    explicit set fails on membership. A clean pass of this rule is not
//!    conclusive, so tools that print errors while exiting 0 fall through to
//!    the patterns, and `exitCodes = []` delegates entirely to them.
//! 4. any error pattern matching the captured output → failure
//! 5. otherwise success
//!
//! The verdict is a pure function of (result, spec): reclassifying the same
//! pair always yields the same answer.

use qualgate_common::Error;
use qualgate_common::config::CommandSpec;

use crate::registry::RegexRegistry;
use crate::{ProcessResult, combined_output, split_lines};

/// Decide whether `result` counts as a failure under `spec`.
///
/// # Errors
///
/// Returns [`Error::Config`] if an error pattern fails to compile. Load-time
/// validation makes this unreachable for specs that came through the config
/// loader.
pub fn classify(
    result: &ProcessResult,
    spec: &CommandSpec,
    registry: &RegexRegistry,
) -> Result<bool, Error> {
    if result.timed_out {
        return Ok(true);
    }
    if result.launch_error.as_ref().is_some_and(|e| !e.is_empty()) {
        return Ok(true);
    }

    match &spec.exit_codes {
        None => {
            if result.exit_code != 0 {
                return Ok(true);
            }
        }
        Some(codes) => {
            if codes.contains(&result.exit_code) {
                return Ok(true);
            }
        }
    }

    if spec.error_patterns.is_empty() {
        return Ok(false);
    }

    let buffer = combined_output(result);
    let lines = split_lines(&buffer);
    for pattern in &spec.error_patterns {
        let re = registry.compile(pattern)?;
        let matched = if pattern.spans_lines() {
            re.is_match(&buffer)
        } else {
            lines.iter().any(|line| re.is_match(line))
        };
        if matched {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use qualgate_common::config::RegexSpec;

    fn spec_with_patterns(patterns: Vec<RegexSpec>) -> CommandSpec {
        let mut spec = CommandSpec::bare("x");
        spec.error_patterns = patterns;
        spec
    }

    #[test]
    fn timeout_is_failure() {
        let registry = RegexRegistry::new();
        let mut result = ProcessResult::exited(0, &b""[..], &b""[..]);
        result.timed_out = true;
        result.exit_code = crate::EXIT_TIMED_OUT;
        assert!(classify(&result, &CommandSpec::bare("x"), &registry).unwrap());
    }

    #[test]
    fn launch_error_is_failure() {
        let registry = RegexRegistry::new();
        let result = ProcessResult::launch_failure("no such binary");
        assert!(classify(&result, &CommandSpec::bare("x"), &registry).unwrap());
    }

    #[test]
    fn default_exit_codes_fail_on_nonzero() {
        let registry = RegexRegistry::new();
        let result = ProcessResult::exited(3, &b""[..], &b""[..]);
        assert!(classify(&result, &CommandSpec::bare("x"), &registry).unwrap());
    }

    #[test]
    fn default_exit_codes_pass_on_zero_without_patterns() {
        let registry = RegexRegistry::new();
        let result = ProcessResult::exited(0, &b"all good\n"[..], &b""[..]);
        assert!(!classify(&result, &CommandSpec::bare("x"), &registry).unwrap());
    }

    #[test]
    fn pattern_match_fails_despite_exit_zero() {
        // Linters that report problems but exit 0.
        let registry = RegexRegistry::new();
        let spec = spec_with_patterns(vec![RegexSpec::with_flags(r"\berrors?\b", "i")]);
        let result = ProcessResult::exited(0, &b"src/a.js: 3 errors\nok\n"[..], &b""[..]);
        assert!(classify(&result, &spec, &registry).unwrap());
    }

    #[test]
    fn explicit_exit_codes_fail_on_membership() {
        let registry = RegexRegistry::new();
        let mut spec = CommandSpec::bare("x");
        spec.exit_codes = Some(vec![2]);
        let result = ProcessResult::exited(2, &b""[..], &b""[..]);
        assert!(classify(&result, &spec, &registry).unwrap());
    }

    #[test]
    fn explicit_exit_codes_fall_through_on_non_membership() {
        let registry = RegexRegistry::new();
        let mut spec = spec_with_patterns(vec![RegexSpec::new("FAIL")]);
        spec.exit_codes = Some(vec![2]);
        // Exit 1 is not in the set; the pattern still decides.
        let matched = ProcessResult::exited(1, &b"FAIL: case\n"[..], &b""[..]);
        assert!(classify(&matched, &spec, &registry).unwrap());
        let clean = ProcessResult::exited(1, &b"all passed\n"[..], &b""[..]);
        assert!(!classify(&clean, &spec, &registry).unwrap());
    }

    #[test]
    fn empty_exit_codes_delegate_to_patterns() {
        let registry = RegexRegistry::new();
        let mut spec = spec_with_patterns(vec![RegexSpec::new("boom")]);
        spec.exit_codes = Some(Vec::new());
        let result = ProcessResult::exited(7, &b"fine\n"[..], &b""[..]);
        assert!(!classify(&result, &spec, &registry).unwrap());
    }

    #[test]
    fn patterns_see_stderr_too() {
        let registry = RegexRegistry::new();
        let spec = spec_with_patterns(vec![RegexSpec::new("panic")]);
        let result = ProcessResult::exited(0, &b"ok\n"[..], &b"thread panic\n"[..]);
        assert!(classify(&result, &spec, &registry).unwrap());
    }

    #[test]
    fn span_flag_matches_across_lines() {
        let registry = RegexRegistry::new();
        let spec = spec_with_patterns(vec![RegexSpec::with_flags("start.*end", "s")]);
        let result = ProcessResult::exited(0, &b"start\nmiddle\nend\n"[..], &b""[..]);
        assert!(classify(&result, &spec, &registry).unwrap());
        // Without the flag the same pattern stays line-scoped and misses.
        let line_spec = spec_with_patterns(vec![RegexSpec::new("start.*end")]);
        assert!(!classify(&result, &line_spec, &registry).unwrap());
    }

    #[test]
    fn verdict_is_deterministic_and_order_independent() {
        let registry = RegexRegistry::new();
        let result = ProcessResult::exited(0, &b"warning: x\nerror: y\n"[..], &b""[..]);
        let forward = spec_with_patterns(vec![RegexSpec::new("error"), RegexSpec::new("warning")]);
        let backward = spec_with_patterns(vec![RegexSpec::new("warning"), RegexSpec::new("error")]);
        let a = classify(&result, &forward, &registry).unwrap();
        let b = classify(&result, &backward, &registry).unwrap();
        let c = classify(&result, &forward, &registry).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(a);
    }
}
