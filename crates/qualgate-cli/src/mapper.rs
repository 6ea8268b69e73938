//! Partitioning of edited files across configured path scopes.
//!
//! A file lands in **every** scope whose glob matches it, so an edit to a
//! shared library can trigger several component checks at once. Files no
//! scope claims form the implicit root group bound to the global command
//! map. There is no dependency inference: a scope runs only when its own
//! glob matched (or in unconditional mode).

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use qualgate_common::Error;
use qualgate_common::config::{Config, PathScope};

/// One bundle of files routed to a single command scope. `scope = None` is
/// the root group using the global command map.
#[derive(Debug, Clone)]
pub struct ComponentGroup<'a> {
    pub scope: Option<&'a PathScope>,
    pub files: Vec<String>,
}

impl ComponentGroup<'_> {
    /// Group label for reports: the scope's glob, or `root`.
    pub fn label(&self) -> &str {
        self.scope.map_or("root", |s| s.path.as_str())
    }
}

/// Compile a configuration glob. `*` and `?` stay within one path segment,
/// `**` crosses segments, `{a,b}` alternation is on. Separators in both the
/// glob and candidate paths are normalized to `/` before matching.
///
/// # Errors
///
/// Returns [`Error::Config`] for an invalid glob.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, Error> {
    let normalized = pattern.replace('\\', "/");
    let glob = GlobBuilder::new(&normalized)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::Config(format!("invalid path glob `{pattern}`: {e}")))?;
    Ok(glob.compile_matcher())
}

/// Route `files` into per-scope groups, in configuration order, with the
/// root group (unmatched files) last. Groups that match nothing are omitted.
///
/// Absolute file paths are matched relative to `root` when they live under
/// it, so workspace-relative globs keep working with hosts that report
/// absolute paths.
///
/// # Errors
///
/// Returns [`Error::Config`] if a configured glob does not compile.
pub fn map_files<'a>(
    config: &'a Config,
    files: &[String],
    root: &Path,
) -> Result<Vec<ComponentGroup<'a>>, Error> {
    let candidates: Vec<(String, &String)> =
        files.iter().map(|f| (match_candidate(f, root), f)).collect();

    let mut groups = Vec::new();
    let mut claimed = vec![false; files.len()];

    for scope in &config.paths {
        let matcher = compile_glob(&scope.path)?;
        let mut matched = Vec::new();
        for (i, (candidate, original)) in candidates.iter().enumerate() {
            if matcher.is_match(candidate) {
                matched.push((*original).clone());
                claimed[i] = true;
            }
        }
        if !matched.is_empty() {
            groups.push(ComponentGroup {
                scope: Some(scope),
                files: matched,
            });
        }
    }

    let unmatched: Vec<String> = candidates
        .iter()
        .zip(&claimed)
        .filter(|&(_, &claimed)| !claimed)
        .map(|((_, original), _)| (*original).clone())
        .collect();
    if !unmatched.is_empty() {
        groups.push(ComponentGroup {
            scope: None,
            files: unmatched,
        });
    }

    Ok(groups)
}

/// Groups for an invocation with no edited-file information: every scope
/// plus the root group, each once, with empty file sets.
pub fn unconditional_groups(config: &Config) -> Vec<ComponentGroup<'_>> {
    let mut groups: Vec<ComponentGroup<'_>> = config
        .paths
        .iter()
        .map(|scope| ComponentGroup {
            scope: Some(scope),
            files: Vec::new(),
        })
        .collect();
    groups.push(ComponentGroup {
        scope: None,
        files: Vec::new(),
    });
    groups
}

/// Normalize a file path for glob matching: forward slashes, and relative to
/// `root` when the path is absolute and lives under it.
fn match_candidate(file: &str, root: &Path) -> String {
    let normalized = file.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute()
        && let Ok(relative) = path.strip_prefix(root)
    {
        return relative.to_string_lossy().replace('\\', "/");
    }
    normalized
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;
