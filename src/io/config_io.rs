use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no {0} directory available on this platform")]
    NoPlatformDir(&'static str),
}

/// `<config_dir>/docket/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoPlatformDir("config"))?;
    Ok(base.join("docket").join("config.toml"))
}

/// `<data_dir>/docket/lists.json`
pub fn default_data_file() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or(ConfigError::NoPlatformDir("data"))?;
    Ok(base.join("docket").join("lists.json"))
}

/// Load config from a path; a missing or blank file yields defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// The data file to use: explicit override, then config, then the platform default
pub fn resolve_data_file(override_path: Option<&Path>, config: &Config) -> Result<PathBuf, ConfigError> {
    if let Some(p) = override_path {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = &config.data_file {
        return Ok(p.clone());
    }
    default_data_file()
}
