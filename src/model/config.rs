use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Override for the JSON data file (default: platform data dir)
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Name of the list created on first run
    #[serde(default = "default_list_name")]
    pub default_list_name: String,
    /// Shown by the starred view when nothing starred is left to do
    #[serde(default = "default_starred_empty_message")]
    pub starred_empty_message: String,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Titles wider than this many terminal cells are truncated in text output
    #[serde(default = "default_title_width")]
    pub title_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: None,
            default_list_name: default_list_name(),
            starred_empty_message: default_starred_empty_message(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title_width: default_title_width(),
        }
    }
}

fn default_list_name() -> String {
    "My Tasks".to_string()
}

fn default_starred_empty_message() -> String {
    "No starred tasks left!".to_string()
}

fn default_title_width() -> usize {
    48
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.default_list_name, "My Tasks");
        assert_eq!(cfg.display.title_width, 48);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
default_list_name = "Inbox"

[display]
title_width = 20
"#,
        )
        .unwrap();
        assert_eq!(cfg.default_list_name, "Inbox");
        assert_eq!(cfg.starred_empty_message, "No starred tasks left!");
        assert_eq!(cfg.display.title_width, 20);
        assert!(cfg.data_file.is_none());
    }
}
