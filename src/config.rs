//! Shell configuration
//!
//! Loaded from `<config_dir>/tracker-shell/config.toml`. A missing file
//! yields defaults; CLI flags override everything here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tshell_core::prelude::*;

const CONFIG_DIR: &str = "tracker-shell";
const CONFIG_FILENAME: &str = "config.toml";

/// Global shell settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
}

/// Where to find the backend binary
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Explicit executable path; skips deployment resolution when set
    pub executable: Option<PathBuf>,

    /// Resolve under `resources_root` instead of the working directory
    pub packaged: bool,

    /// Resources root of the packaged bundle
    pub resources_root: Option<PathBuf>,
}

/// Default config file location, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Load settings from the given path, or the default location.
/// A missing file is not an error.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(Settings::default()),
        },
    };

    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let settings = toml::from_str(&raw)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(settings)
}
