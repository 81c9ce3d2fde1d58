//! User configuration loaded from `$XDG_CONFIG_HOME/proofdesk/config.toml`.
//!
//! Every field is optional. A missing file yields defaults silently; an
//! unreadable or malformed file yields defaults plus a warning the caller
//! prints before the terminal is taken over.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::BackendKind;

pub const DEFAULT_THEME: &str = "catppuccin-mocha";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_STORE_PATH: &str = ".proofdesk/reviews.db";
pub const TOKEN_ENV: &str = "PROOFDESK_API_TOKEN";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    pub log_level: String,
    pub backend: BackendKind,
    pub api: ApiConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_owned(),
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            backend: BackendKind::default(),
            api: ApiConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_STORE_PATH) }
    }
}

/// Prefers `$XDG_CONFIG_HOME/proofdesk/config.toml`; falls back to
/// `~/.config/proofdesk/config.toml`.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("proofdesk").join("config.toml")
}

/// Loads the config at `path`. Never fails; problems come back as a warning.
pub fn load(path: &Path) -> (Config, Option<String>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return (Config::default(), None);
        }
        Err(error) => {
            return (Config::default(), Some(format!("cannot read {}: {error}", path.display())));
        }
    };
    parse(&raw).map_or_else(
        |error| (Config::default(), Some(format!("config parse error in {}: {error}", path.display()))),
        |config| (config, None),
    )
}

pub fn parse(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}
