//! Rendering of the final report on stderr.
//!
//! One block per failing group; successes stay silent unless verbose mode is
//! on. Stdout is never used; the host assistant owns it.

use std::io::{self, Write};

/// The classified, filtered outcome of one group, ready to render.
#[derive(Debug, Clone)]
pub struct GroupReport {
    /// Group label: the scope's glob, or `root`.
    pub label: String,
    /// The command line that ran, `command arg arg ...`.
    pub command_line: String,
    pub failed: bool,
    /// Bounded excerpt; empty for successes.
    pub excerpt: Vec<u8>,
}

/// Write failure blocks (and verbose confirmations) in group order.
///
/// # Errors
///
/// Propagates write failures on `w`.
pub fn render(reports: &[GroupReport], verbose: bool, w: &mut impl Write) -> io::Result<()> {
    let mut wrote_block = false;
    for report in reports {
        if report.failed {
            if wrote_block {
                writeln!(w)?;
            }
            writeln!(w, "\u{25b6} {}: {}", report.label, report.command_line)?;
            if !report.excerpt.is_empty() {
                w.write_all(&report.excerpt)?;
                if !report.excerpt.ends_with(b"\n") {
                    writeln!(w)?;
                }
            }
            wrote_block = true;
        } else if verbose {
            writeln!(w, "[qualgate] {} ok: {}", report.label, report.command_line)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn report(label: &str, failed: bool, excerpt: &str) -> GroupReport {
        GroupReport {
            label: label.to_string(),
            command_line: "lint --strict".to_string(),
            failed,
            excerpt: excerpt.as_bytes().to_vec(),
        }
    }

    fn rendered(reports: &[GroupReport], verbose: bool) -> String {
        let mut out = Vec::new();
        render(reports, verbose, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn failing_group_renders_a_block() {
        let out = rendered(&[report("web/**", true, "error: bad\n")], false);
        assert_eq!(out, "\u{25b6} web/**: lint --strict\nerror: bad\n");
    }

    #[test]
    fn blocks_are_separated_by_a_blank_line() {
        let out = rendered(
            &[report("a/**", true, "x\n"), report("b/**", true, "y")],
            false,
        );
        assert_eq!(
            out,
            "\u{25b6} a/**: lint --strict\nx\n\n\u{25b6} b/**: lint --strict\ny\n"
        );
    }

    #[test]
    fn successes_are_silent_by_default() {
        assert!(rendered(&[report("root", false, "")], false).is_empty());
    }

    #[test]
    fn verbose_confirms_successes() {
        let out = rendered(&[report("root", false, "")], true);
        assert_eq!(out, "[qualgate] root ok: lint --strict\n");
    }
}
