use std::collections::BTreeMap;

use serde::Serialize;

/// Hard per-stream cap on captured subprocess output, in bytes. Applies when
/// a command spec leaves `maxOutput` at 0 (unbounded).
pub const HARD_OUTPUT_CAP: usize = 10 * 1024 * 1024;

/// Flag letters accepted on a [`RegexSpec`]: case-insensitive, multi-line,
/// dot-matches-newline, ungreedy.
pub const REGEX_FLAGS: &str = "imsU";

/// A regex pattern source plus its flag subset, as written in configuration.
///
/// Compilation happens in the regex registry; this type only carries the
/// source text. Flag letters outside [`REGEX_FLAGS`] are rejected at load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexSpec {
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
}

impl RegexSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: String::new(),
        }
    }

    pub fn with_flags(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// True when the pattern carries the multi-line or dot-all flag, i.e. it
    /// is meant to match across line boundaries rather than per line.
    pub fn spans_lines(&self) -> bool {
        self.flags.contains('m') || self.flags.contains('s')
    }
}

/// The canonical, flattened description of one quality command.
///
/// Loading accepts both this flat shape and the legacy nested shape with
/// `errorDetection` / `outputFilter` sub-objects; both canonicalize to this
/// struct. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    /// Program to execute. Launched without a shell; never empty.
    pub command: String,

    /// Argument vector, passed as array members (no shell expansion).
    pub args: Vec<String>,

    /// Working directory for the subprocess. Defaults to the invocation
    /// directory when absent.
    pub working_dir: Option<String>,

    /// Per-command timeout in milliseconds. Falls back to the dispatcher-wide
    /// default when absent.
    pub timeout_ms: Option<u64>,

    /// Exit codes that indicate failure. `None` means "any non-zero exit
    /// fails"; an explicit empty list means exit codes never decide on their
    /// own and only the error patterns do.
    pub exit_codes: Option<Vec<i32>>,

    /// Patterns whose match on captured output signals failure regardless of
    /// exit code.
    pub error_patterns: Vec<RegexSpec>,

    /// Patterns that select additional lines for the excerpt without
    /// affecting the verdict.
    pub include_patterns: Vec<RegexSpec>,

    /// Lines of context kept around each matched line in the excerpt.
    pub context_lines: usize,

    /// Byte cap on captured output and on the rendered excerpt. 0 means
    /// unbounded up to [`HARD_OUTPUT_CAP`].
    pub max_output: usize,

    /// Informational text for the host assistant; never interpreted.
    pub prompt: Option<String>,
}

impl CommandSpec {
    /// A minimal spec for `command` with every optional field at its default.
    pub fn bare(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            timeout_ms: None,
            exit_codes: None,
            error_patterns: Vec::new(),
            include_patterns: Vec::new(),
            context_lines: 0,
            max_output: 0,
            prompt: None,
        }
    }

    /// The effective capture cap for this spec, in bytes.
    pub fn capture_cap(&self) -> usize {
        if self.max_output == 0 {
            HARD_OUTPUT_CAP
        } else {
            self.max_output
        }
    }

    /// Render `command arg arg ...` for report headers and logs.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// A path-glob-scoped override of the global command map.
///
/// When an edited file is routed to this scope, the override's spec is used
/// verbatim for that group; there is no field-level merging with the global
/// spec of the same command name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathScope {
    /// Glob this scope matches, e.g. `packages/frontend/**`.
    pub path: String,

    /// Informational lineage marker; ignored by the dispatch pipeline.
    pub extends: Option<String>,

    /// Command-name → spec overrides active inside this scope.
    pub commands: BTreeMap<String, CommandSpec>,
}

/// The validated, immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Schema version; `"1.0"` is the only accepted value.
    pub version: String,

    /// Informational project type label (e.g. `"rust"`, `"node"`).
    pub project_type: Option<String>,

    /// Global command map, keyed by command name (`lint`, `test`, ...).
    pub commands: BTreeMap<String, CommandSpec>,

    /// Path-scoped overrides, in declaration order. Order matters: groups are
    /// built and reported in this order.
    pub paths: Vec<PathScope>,

    /// Extra command basenames to refuse, merged with the built-in blocklist.
    pub blocked_commands: Vec<String>,
}

impl Config {
    /// Look up the spec for `command_name` inside `scope` first, then in the
    /// global map. `None` when neither defines it.
    pub fn resolve<'a>(
        &'a self,
        scope: Option<&'a PathScope>,
        command_name: &str,
    ) -> Option<&'a CommandSpec> {
        if let Some(scope) = scope
            && let Some(spec) = scope.commands.get(command_name)
        {
            return Some(spec);
        }
        self.commands.get(command_name)
    }
}
