//! Pre-spawn safety policy for resolved command specifications.
//!
//! Every spec the runner sees has passed this validator. The invocation is
//! non-interactive and processes launch without a shell, so argument
//! expansion attacks are not possible; scrutiny focuses on command identity
//! (metacharacters, blocklist) and on path escape (traversal, sensitive
//! system prefixes).

use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;

use qualgate_common::Error;
use qualgate_common::config::{CommandSpec, Config};

/// Command basenames that must never execute, regardless of configuration.
/// Destructive file-tree operators, disk formatters, and machine-state
/// changers. `mkfs` also covers its dotted variants (`mkfs.ext4`, ...).
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "rm", "rmdir", "unlink", "shred", "dd", "mkfs", "fdisk", "parted", "format", "shutdown",
    "reboot", "halt", "poweroff", "init",
];

const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '>', '<', '`', '$', '(', ')', '{', '}', '[', ']', '\n', '\r',
];

const SENSITIVE_PREFIXES: &[&str] = &["/etc", "/sys", "/proc", "/dev"];
const SENSITIVE_PREFIXES_WINDOWS: &[&str] = &["c:/windows", "c:/system32"];

/// The blocklist-bearing validator. Built once per invocation from the
/// configuration's extra `blockedCommands`, then applied to every resolved
/// spec before it reaches the executor.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    blocked: Vec<String>,
}

impl SecurityPolicy {
    pub fn from_config(config: &Config) -> Self {
        let mut blocked: Vec<String> = DEFAULT_BLOCKLIST.iter().map(ToString::to_string).collect();
        for extra in &config.blocked_commands {
            let lowered = extra.to_lowercase();
            if !lowered.is_empty() && !blocked.contains(&lowered) {
                blocked.push(lowered);
            }
        }
        Self { blocked }
    }

    /// Apply rules 1–5 in order. Rejection is fatal for the invocation; the
    /// dispatcher must not fall back silently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Security`] naming the violated rule.
    pub fn validate(&self, spec: &CommandSpec) -> Result<(), Error> {
        let command = spec.command.trim();
        if command.is_empty() {
            return Err(Error::Security("empty command name".into()));
        }

        if let Some(bad) = command.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(Error::Security(format!(
                "command name `{command}` contains shell metacharacter `{}`",
                bad.escape_default()
            )));
        }

        if let Some(working_dir) = spec.working_dir.as_deref() {
            for arg in &spec.args {
                check_traversal(arg, working_dir)?;
            }
        }

        for arg in &spec.args {
            check_sensitive_prefix(arg)?;
        }

        self.check_blocklist(command)?;
        Ok(())
    }

    fn check_blocklist(&self, command: &str) -> Result<(), Error> {
        let basename = Path::new(command)
            .file_name()
            .map_or_else(|| command.to_lowercase(), |n| n.to_string_lossy().to_lowercase());

        for entry in &self.blocked {
            if basename == *entry || basename.starts_with(&format!("{entry}.")) {
                return Err(Error::Security(format!(
                    "command `{command}` is on the blocklist"
                )));
            }
        }
        Ok(())
    }
}

/// Reject an argument whose lexical normalization still climbs out of the
/// configured working directory via `..` components.
fn check_traversal(arg: &str, working_dir: &str) -> Result<(), Error> {
    let path = Path::new(arg);
    if !path.components().any(|c| c == Component::ParentDir) {
        return Ok(());
    }

    let root = PathBuf::from(working_dir).clean();
    let resolved = if path.is_absolute() {
        path.clean()
    } else {
        root.join(path).clean()
    };
    if !resolved.starts_with(&root) {
        return Err(Error::Security(format!(
            "argument `{arg}` resolves outside the working directory `{working_dir}`"
        )));
    }
    Ok(())
}

fn check_sensitive_prefix(arg: &str) -> Result<(), Error> {
    let normalized = arg.replace('\\', "/");
    let lowered = normalized.to_lowercase();

    let path = Path::new(&normalized);
    for prefix in SENSITIVE_PREFIXES {
        if path.starts_with(prefix) {
            return Err(Error::Security(format!(
                "argument `{arg}` points into protected system path `{prefix}`"
            )));
        }
    }
    for prefix in SENSITIVE_PREFIXES_WINDOWS {
        if lowered == *prefix || lowered.starts_with(&format!("{prefix}/")) {
            return Err(Error::Security(format!(
                "argument `{arg}` points into a protected system path"
            )));
        }
    }
    Ok(())
}
