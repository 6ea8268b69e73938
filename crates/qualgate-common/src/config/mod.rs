//! Configuration model: JSON decoding, canonicalization, and structural
//! validation.
//!
//! Discovery (where the file lives) and regex compilation are the CLI's
//! concern; this module guarantees shape and bounds so the rest of the
//! pipeline can treat a [`Config`] as immutable and well-formed.

mod raw;
pub mod types;

pub use types::{CommandSpec, Config, HARD_OUTPUT_CAP, PathScope, REGEX_FLAGS, RegexSpec};

use crate::Error;

fn unknown_flag(flags: &str) -> Option<char> {
    flags.chars().find(|c| !REGEX_FLAGS.contains(*c))
}

/// Check a flag string against the accepted letters.
///
/// # Errors
///
/// Returns [`Error::Config`] naming the first unknown letter.
pub fn validate_flags(flags: &str) -> Result<(), Error> {
    match unknown_flag(flags) {
        Some(bad) => Err(Error::Config(format!(
            "unknown regex flag `{bad}` (accepted: {REGEX_FLAGS})"
        ))),
        None => Ok(()),
    }
}

impl Config {
    /// Decode and validate a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed JSON, unknown fields, a
    /// missing or unsupported `version`, empty command strings, empty or
    /// unknown-flag regex patterns, or a flat/nested field mix.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let raw: raw::RawConfig = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("malformed configuration JSON: {e}")))?;
        let config = raw.canonicalize()?;
        config.validate()?;
        Ok(config)
    }

    /// Byte-slice variant of [`Config::from_json_str`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`Config::from_json_str`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Config(format!("configuration is not valid UTF-8: {e}")))?;
        Self::from_json_str(text)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.version != "1.0" {
            return Err(Error::Config(format!(
                "unsupported configuration version `{}` (expected \"1.0\")",
                self.version
            )));
        }

        for (name, spec) in &self.commands {
            validate_spec(name, spec)?;
        }
        for scope in &self.paths {
            for (name, spec) in &scope.commands {
                validate_spec(&format!("{}::{name}", scope.path), spec)?;
            }
        }
        Ok(())
    }
}

fn validate_spec(name: &str, spec: &CommandSpec) -> Result<(), Error> {
    if spec.command.trim().is_empty() {
        return Err(Error::Config(format!("command `{name}` has an empty program name")));
    }
    for pattern in spec.error_patterns.iter().chain(&spec.include_patterns) {
        if pattern.pattern.is_empty() {
            return Err(Error::Config(format!("command `{name}` has an empty regex pattern")));
        }
        if let Some(bad) = unknown_flag(&pattern.flags) {
            return Err(Error::Config(format!(
                "command `{name}`: unknown regex flag `{bad}` (accepted: {REGEX_FLAGS})"
            )));
        }
    }
    Ok(())
}
