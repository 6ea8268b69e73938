//! Compile-once cache for configured regex patterns.
//!
//! The registry is the only shared mutable object in an invocation. Workers
//! on several threads may request the same pattern concurrently; compilation
//! happens at most once per (pattern, flags) pair and the compiled regex is
//! shared behind an `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use regex::bytes::Regex;

use qualgate_common::Error;
use qualgate_common::config::{Config, RegexSpec, validate_flags};

/// Thread-safe registry of compiled byte-oriented regexes.
#[derive(Debug, Default)]
pub struct RegexRegistry {
    cache: Mutex<HashMap<RegexSpec, Arc<Regex>>>,
}

impl RegexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `spec`, or return the cached compilation.
    ///
    /// Flags are applied by prepending an inline `(?...)` group, so `i`,
    /// `m`, `s`, and `U` keep their library semantics. Matching is over raw
    /// bytes; invalid UTF-8 in tool output cannot fail a match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown flag letter or a pattern the
    /// regex library rejects.
    pub fn compile(&self, spec: &RegexSpec) -> Result<Arc<Regex>, Error> {
        validate_flags(&spec.flags)?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = cache.get(spec) {
            return Ok(Arc::clone(compiled));
        }

        let source = if spec.flags.is_empty() {
            spec.pattern.clone()
        } else {
            format!("(?{}){}", spec.flags, spec.pattern)
        };
        let compiled = Regex::new(&source).map_err(|e| {
            Error::Config(format!("invalid regex `{}`: {e}", spec.pattern))
        })?;

        let compiled = Arc::new(compiled);
        cache.insert(spec.clone(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Compile every pattern the configuration mentions, so pattern errors
    /// surface at load time instead of mid-run.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Config`] encountered.
    pub fn precompile(&self, config: &Config) -> Result<(), Error> {
        let global = config.commands.values();
        let scoped = config.paths.iter().flat_map(|s| s.commands.values());
        for spec in global.chain(scoped) {
            for pattern in spec.error_patterns.iter().chain(&spec.include_patterns) {
                self.compile(pattern)?;
            }
        }
        Ok(())
    }
}
