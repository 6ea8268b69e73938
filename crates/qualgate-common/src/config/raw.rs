//! Serde-facing shapes for the configuration file.
//!
//! Two command shapes exist in the wild: the flat one and a legacy nested one
//! with `errorDetection` / `outputFilter` sub-objects. Both deserialize here
//! and canonicalize to [`CommandSpec`]; mixing the nested sub-object with its
//! flat counterparts in one command is rejected rather than guessed at.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Error;

use super::types::{CommandSpec, Config, PathScope, RegexSpec};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct RawConfig {
    pub version: Option<String>,
    pub project_type: Option<String>,
    #[serde(default)]
    pub commands: BTreeMap<String, RawCommand>,
    #[serde(default)]
    pub paths: Vec<RawPathScope>,
    #[serde(default)]
    pub blocked_commands: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct RawPathScope {
    pub path: String,
    pub extends: Option<String>,
    #[serde(default)]
    pub commands: BTreeMap<String, RawCommand>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct RawCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub timeout: Option<u64>,
    pub exit_codes: Option<Vec<i32>>,
    pub error_patterns: Option<Vec<RegexSpec>>,
    pub include_patterns: Option<Vec<RegexSpec>>,
    pub context_lines: Option<u64>,
    pub max_output: Option<u64>,
    pub prompt: Option<String>,
    pub error_detection: Option<RawErrorDetection>,
    pub output_filter: Option<RawOutputFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct RawErrorDetection {
    pub exit_codes: Option<Vec<i32>>,
    pub error_patterns: Option<Vec<RegexSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct RawOutputFilter {
    pub include_patterns: Option<Vec<RegexSpec>>,
    pub context_lines: Option<u64>,
    pub max_output: Option<u64>,
}

fn to_usize(value: Option<u64>, field: &str, context: &str) -> Result<usize, Error> {
    match value {
        None => Ok(0),
        Some(v) => usize::try_from(v)
            .map_err(|_| Error::Config(format!("{context}: `{field}` value {v} is out of range"))),
    }
}

impl RawCommand {
    /// Flatten into the canonical shape, rejecting a flat/nested mix.
    pub(super) fn canonicalize(self, context: &str) -> Result<CommandSpec, Error> {
        let (exit_codes, error_patterns) = match self.error_detection {
            Some(nested) => {
                if self.exit_codes.is_some() || self.error_patterns.is_some() {
                    return Err(Error::Config(format!(
                        "{context}: `errorDetection` cannot be combined with flat \
                         `exitCodes`/`errorPatterns`"
                    )));
                }
                (nested.exit_codes, nested.error_patterns)
            }
            None => (self.exit_codes, self.error_patterns),
        };

        let (include_patterns, context_lines, max_output) = match self.output_filter {
            Some(nested) => {
                if self.include_patterns.is_some()
                    || self.context_lines.is_some()
                    || self.max_output.is_some()
                {
                    return Err(Error::Config(format!(
                        "{context}: `outputFilter` cannot be combined with flat \
                         `includePatterns`/`contextLines`/`maxOutput`"
                    )));
                }
                (nested.include_patterns, nested.context_lines, nested.max_output)
            }
            None => (self.include_patterns, self.context_lines, self.max_output),
        };

        Ok(CommandSpec {
            command: self.command,
            args: self.args,
            working_dir: self.working_dir,
            timeout_ms: self.timeout,
            exit_codes,
            error_patterns: error_patterns.unwrap_or_default(),
            include_patterns: include_patterns.unwrap_or_default(),
            context_lines: to_usize(context_lines, "contextLines", context)?,
            max_output: to_usize(max_output, "maxOutput", context)?,
            prompt: self.prompt,
        })
    }
}

fn canonicalize_commands(
    raw: BTreeMap<String, RawCommand>,
    where_: &str,
) -> Result<BTreeMap<String, CommandSpec>, Error> {
    raw.into_iter()
        .map(|(name, cmd)| {
            let context = format!("{where_}command `{name}`");
            Ok((name, cmd.canonicalize(&context)?))
        })
        .collect()
}

impl RawConfig {
    pub(super) fn canonicalize(self) -> Result<Config, Error> {
        let version = match self.version {
            Some(v) if !v.is_empty() => v,
            _ => return Err(Error::Config("missing required field `version`".into())),
        };

        let commands = canonicalize_commands(self.commands, "")?;

        let paths = self
            .paths
            .into_iter()
            .map(|scope| {
                if scope.path.is_empty() {
                    return Err(Error::Config("path override with empty `path` glob".into()));
                }
                let where_ = format!("path `{}`, ", scope.path);
                Ok(PathScope {
                    commands: canonicalize_commands(scope.commands, &where_)?,
                    path: scope.path,
                    extends: scope.extends,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Config {
            version,
            project_type: self.project_type,
            commands,
            paths,
            blocked_commands: self.blocked_commands,
        })
    }
}
