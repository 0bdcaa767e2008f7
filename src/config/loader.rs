// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Assetdag.toml";

/// Parse `path` as TOML without any semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&text)?)
}

/// Parse and validate `path`. Groups, globs and watch targets are checked.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let validated = ConfigFile::try_from(load_from_path(path)?)?;
    debug!(path = %path.display(), "config loaded");
    Ok(validated)
}

/// Like [`load_and_validate`], except that an absent file at
/// [`default_config_path`] yields [`ConfigFile::default`].
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let implicit = path == default_config_path();
    if implicit && !path.exists() {
        info!(file = DEFAULT_CONFIG_FILE, "no config file; using built-in tasks");
        return Ok(ConfigFile::default());
    }
    load_and_validate(path)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
