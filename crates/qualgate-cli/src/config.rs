//! Configuration discovery and loading.
//!
//! Discovery order: an explicit `--config` path, then `.qualgate.json` /
//! `qualgate.json` walking up from the invocation directory, then the user
//! config dir (`~/.config/qualgate/qualgate.json`). Loading validates shape
//! and compiles every configured regex so pattern errors surface before any
//! process is spawned.

use std::path::{Path, PathBuf};

use qualgate_common::{Error, config::Config};
use qualgate_filter::registry::RegexRegistry;

/// File names probed in each directory, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".qualgate.json", "qualgate.json"];

/// Load the configuration, honoring an explicit path override.
///
/// # Errors
///
/// Returns [`Error::Config`] when no file is found, the file cannot be read,
/// or its content fails validation.
pub fn load(explicit: Option<&Path>) -> Result<Config, Error> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| Error::Config(format!("cannot determine current directory: {e}")))?;
            discover_from(&cwd).ok_or_else(|| {
                Error::Config(
                    "no configuration found (searched for .qualgate.json / qualgate.json \
                     up from the current directory and in the user config dir)"
                        .into(),
                )
            })?
        }
    };
    load_file(&path)
}

/// Read, decode, and fully validate one configuration file.
///
/// # Errors
///
/// Returns [`Error::Config`] for I/O failures and any validation failure,
/// including regex patterns the registry rejects.
pub fn load_file(path: &Path) -> Result<Config, Error> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Config(format!("cannot read `{}`: {e}", path.display())))?;
    let config = Config::from_slice(&bytes)?;
    RegexRegistry::new().precompile(&config)?;
    Ok(config)
}

/// Walk up from `start` probing for a config file; fall back to the user
/// config dir.
pub fn discover_from(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        dir = current.parent();
    }
    user_config_file()
}

fn user_config_file() -> Option<PathBuf> {
    let candidate = dirs::config_dir()?.join("qualgate").join("qualgate.json");
    candidate.is_file().then_some(candidate)
}
