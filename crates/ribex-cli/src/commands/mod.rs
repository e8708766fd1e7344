//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use ribex_core::models::config::RibexConfig;

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ribex")
        .join("config.json")
}

/// Load the configuration from `-c`, else the user file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RibexConfig> {
    if let Some(path) = config_path {
        return RibexConfig::from_file(Path::new(path))
            .with_context(|| format!("Cannot read config file {}", path));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        RibexConfig::from_file(&path)
            .with_context(|| format!("Cannot read config file {}", path.display()))
    } else {
        Ok(RibexConfig::default())
    }
}
