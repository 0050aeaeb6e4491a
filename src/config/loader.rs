//! Reading `field-tracker.toml`.

use crate::config::schema::{EngineConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Where a configuration came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Inline => write!(f, "<inline>"),
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read engine config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("engine config {origin} is not valid TOML: {source}")]
    Toml {
        origin: ConfigOrigin,
        source: toml_edit::de::Error,
    },

    #[error("engine config {origin} has invalid {}:\n{source}", section_list(.source))]
    Validation {
        origin: ConfigOrigin,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> ConfigOrigin {
        match self {
            ConfigError::Io { path, .. } => ConfigOrigin::File(path.clone()),
            ConfigError::Toml { origin, .. } | ConfigError::Validation { origin, .. } => {
                origin.clone()
            }
        }
    }
}

fn section_list(error: &ValidationError) -> String {
    error
        .sections()
        .iter()
        .map(|section| format!("[{section}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse(input: &str, origin: ConfigOrigin) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    if let Err(source) = config.validate() {
        return Err(ConfigError::Validation { origin, source });
    }
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&contents, ConfigOrigin::File(path.to_path_buf()))?;
    debug!(path = %path.display(), "engine config loaded");
    Ok(config)
}

/// Load a config file, or the defaults when `path` does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no engine config, using defaults");
        return Ok(EngineConfig::default());
    }
    load_from_path(path)
}
