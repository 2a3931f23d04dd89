// src/config.rs

//! Configuration loading utilities.
//!
//! Reads the TOML application config and keeps the secret-free
//! `changelogs.json` projection in the cache directory up to date.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{AppConfig, LoaderConfig, SerializedConfig, Settings};
use crate::storage::local::{read_bytes, write_bytes};

/// Name of the persisted changelog configuration inside the cache directory.
pub const LOADER_CONFIG_FILE: &str = "changelogs.json";

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Project {
    pub settings: Settings,
    pub loader: LoaderConfig,
    /// Directory of the config file; local changelogs resolve against it
    pub root: PathBuf,
}

/// Load and validate the application config at `config_path`.
///
/// Settings and changelog issues are reported together. A relative
/// `cache_dir` is taken relative to the config file.
pub fn load_all(config_path: &Path) -> Result<Project> {
    let config = AppConfig::load(config_path)?;

    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut issues = Vec::new();
    if let Err(AppError::InvalidConfig { issues: found }) = config.settings.validate() {
        issues.extend(found);
    }
    let loader = match LoaderConfig::resolve(config.changelogs) {
        Ok(loader) => Some(loader),
        Err(AppError::InvalidConfig { issues: found }) => {
            issues.extend(found);
            None
        }
        Err(e) => return Err(e),
    };

    match loader {
        Some(loader) if issues.is_empty() => {
            let mut settings = config.settings;
            settings.cache_dir = root.join(&settings.cache_dir);
            Ok(Project {
                settings,
                loader,
                root,
            })
        }
        _ => Err(AppError::invalid_config(issues)),
    }
}

pub fn loader_config_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(LOADER_CONFIG_FILE)
}

/// Persist the serialized projection of `config`.
///
/// The file is only rewritten when its contents change, so file watchers
/// downstream are not woken up for nothing. Returns whether it was written.
pub async fn save_loader_config(path: &Path, config: &LoaderConfig) -> Result<bool> {
    let content = serde_json::to_string_pretty(&config.serialized())?;

    if read_bytes(path).await?.as_deref() == Some(content.as_bytes()) {
        log::debug!("{} is up to date", path.display());
        return Ok(false);
    }

    write_bytes(path, content.as_bytes()).await?;
    log::debug!("Saved changelog configuration to {}", path.display());
    Ok(true)
}

/// Read the persisted projection. A missing file reads as no changelogs.
pub async fn read_loader_config(path: &Path) -> Result<Vec<SerializedConfig>> {
    match read_bytes(path).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| AppError::parse(path.display().to_string(), e)),
        None => Ok(Vec::new()),
    }
}
