//! Helper utilities for config path handling.

use super::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, DEFAULT_LOG_FILE};
use crate::ConfigError;
use directories::UserDirs;
use std::path::{Component, Path, PathBuf};

/// Resolve a user-supplied path: `~` expands to the home directory,
/// relative paths join `base_dir`, absolute paths pass through.
pub fn resolve_path(path: &Path, base_dir: &Path) -> Result<PathBuf, ConfigError> {
    let mut components = path.components();
    if matches!(components.next(), Some(Component::Normal(first)) if first == "~") {
        let home = home_dir().ok_or_else(|| ConfigError::NoHomeDir(path.display().to_string()))?;
        return Ok(home.join(components.as_path()));
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(base_dir.join(path))
}

/// `~/.agent-breadcrumbs/config.json5`, when a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
}

/// `~/.agent-breadcrumbs/logs.jsonl`, relative to the cwd without a home.
pub fn default_log_file_path() -> PathBuf {
    home_dir()
        .unwrap_or_default()
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_LOG_FILE)
}

fn home_dir() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}
