//! Command handlers for the `resizer` binary.

pub mod config;
pub mod run;

use anyhow::Context;
use resizer_core::Config;
use std::path::Path;

/// Load the config from an explicit path, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load()?),
    }
}
