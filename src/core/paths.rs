// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_ENV_VAR, CONFIG_FILENAME, HISTORY_FILENAME};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the system config directory.")]
    ConfigDirNotFound,
    #[error("Could not find the home directory.")]
    HomeDirNotFound,
    #[error("Failed to expand path '{template}': {message}")]
    Expansion { template: String, message: String },
}

/// Returns the msh configuration directory (`~/.config/msh` on Linux).
/// Unlike the history file, nothing is ever created here.
pub fn get_msh_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Location of the configuration file: `$MSH_CONFIG` when set, otherwise
/// `config.toml` inside [`get_msh_config_dir`].
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    match env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => get_msh_config_dir().map(|dir| dir.join(CONFIG_FILENAME)),
    }
}

/// Default history file: `~/.msh_history`.
pub fn get_default_history_path() -> Result<PathBuf, PathError> {
    dirs::home_dir()
        .map(|home| home.join(HISTORY_FILENAME))
        .ok_or(PathError::HomeDirNotFound)
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a user-supplied path.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_plain_path_is_unchanged() {
        let path = expand_path("/tmp/msh/history").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/msh/history"));
    }

    #[test]
    fn test_expand_tilde_uses_home() {
        if let Some(home) = dirs::home_dir() {
            let path = expand_path("~/.msh_history").unwrap();
            assert_eq!(path, home.join(".msh_history"));
        }
    }

    #[test]
    fn test_expand_unknown_variable_fails() {
        let result = expand_path("$MSH_SURELY_UNDEFINED_VARIABLE_42/history");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }
}
