//! # Config Loader
//!
//! Resolves the shell's startup settings from three layers, highest priority
//! first: command-line flags, the optional `config.toml`, built-in defaults.
//! Every limit must be a positive integer; anything else is a configuration
//! error and the shell refuses to start.

use crate::{
    constants::DEFAULT_PROMPT,
    core::paths::{self, PathError},
    models::Limits,
};
use serde::Deserialize;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("'{key}' must be a positive integer, found {value}.")]
    NotPositive { key: &'static str, value: i64 },
    #[error("Path Error: {0}")]
    Path(#[from] PathError),
}

/// The on-disk `config.toml` layout. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub max_jobs: Option<i64>,
    pub max_line: Option<i64>,
    pub max_history: Option<i64>,
    pub history_file: Option<String>,
    pub prompt: Option<String>,
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub max_jobs: Option<usize>,
    pub max_line: Option<usize>,
    pub max_history: Option<usize>,
    pub history_file: Option<PathBuf>,
    pub no_history_file: bool,
}

/// Fully resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub limits: Limits,
    /// Where history is persisted; `None` keeps it in memory only.
    pub history_file: Option<PathBuf>,
    pub prompt: String,
}

/// Reads the config file if it exists. A missing file is an empty layer.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No config file at '{}'.", path.display());
            return Ok(ConfigFile::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    log::debug!("Loading config file '{}'.", path.display());
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Merges the layers into final [`Settings`].
pub fn resolve_settings(file: &ConfigFile, overrides: &Overrides) -> Result<Settings, ConfigError> {
    let defaults = Limits::default();
    let limits = Limits {
        max_jobs: pick(overrides.max_jobs, file.max_jobs, "max_jobs", defaults.max_jobs)?,
        max_line: pick(overrides.max_line, file.max_line, "max_line", defaults.max_line)?,
        max_history: pick(
            overrides.max_history,
            file.max_history,
            "max_history",
            defaults.max_history,
        )?,
    };

    let history_file = if overrides.no_history_file {
        None
    } else if let Some(path) = &overrides.history_file {
        Some(path.clone())
    } else if let Some(template) = &file.history_file {
        Some(paths::expand_path(template)?)
    } else {
        match paths::get_default_history_path() {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("{}; history will not be persisted.", e);
                None
            }
        }
    };

    Ok(Settings {
        limits,
        history_file,
        prompt: file
            .prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
    })
}

/// Loads the config file from its standard location and merges it with `overrides`.
pub fn load_settings(overrides: &Overrides) -> Result<Settings, ConfigError> {
    let file = match paths::get_config_file_path() {
        Ok(path) => load_config_file(&path)?,
        Err(e) => {
            log::debug!("{}; using defaults.", e);
            ConfigFile::default()
        }
    };
    resolve_settings(&file, overrides)
}

fn pick(
    flag: Option<usize>,
    file_value: Option<i64>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    if let Some(value) = flag {
        return Ok(value);
    }
    match file_value {
        None => Ok(default),
        Some(value) => usize::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError::NotPositive { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_history() -> Overrides {
        Overrides {
            no_history_file: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_when_nothing_given() {
        let settings = resolve_settings(&ConfigFile::default(), &no_history()).unwrap();
        assert_eq!(settings.limits, Limits::default());
        assert_eq!(settings.limits.max_jobs, 16);
        assert_eq!(settings.limits.max_line, 1024);
        assert_eq!(settings.limits.max_history, 10);
        assert_eq!(settings.prompt, "msh> ");
        assert!(settings.history_file.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let file = ConfigFile {
            max_jobs: Some(4),
            max_history: Some(3),
            ..Default::default()
        };
        let overrides = Overrides {
            max_jobs: Some(2),
            ..no_history()
        };
        let settings = resolve_settings(&file, &overrides).unwrap();
        assert_eq!(settings.limits.max_jobs, 2);
        assert_eq!(settings.limits.max_history, 3);
        assert_eq!(settings.limits.max_line, 1024);
    }

    #[test]
    fn test_non_positive_file_value_rejected() {
        let file = ConfigFile {
            max_line: Some(0),
            ..Default::default()
        };
        let result = resolve_settings(&file, &no_history());
        assert!(matches!(
            result,
            Err(ConfigError::NotPositive { key: "max_line", value: 0 })
        ));
    }

    #[test]
    fn test_load_config_file_parses_toml() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "max_jobs = 8\nhistory_file = \"/tmp/msh-test-history\"\nprompt = \"$ \"\n",
        )
        .unwrap();

        // --- Execute ---
        let file = load_config_file(&path).unwrap();
        let settings = resolve_settings(&file, &Overrides::default()).unwrap();

        // --- Assert ---
        assert_eq!(settings.limits.max_jobs, 8);
        assert_eq!(settings.prompt, "$ ");
        assert_eq!(
            settings.history_file,
            Some(PathBuf::from("/tmp/msh-test-history"))
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_jobz = 8\n").unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();
        let file = load_config_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(file, ConfigFile::default());
    }
}
