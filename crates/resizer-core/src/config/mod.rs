//! Configuration management for the resizer.
//!
//! Configuration is read from a TOML file (or a JSON file, detected by the
//! `.json` extension) with sensible defaults for every field. Relative paths in
//! the file are resolved against the file's own directory. Unknown keys are
//! rejected.
//!
//! JSON files may also use the flat layout of earlier releases
//! (`source_folder`, `number_of_threads`, `resize_width`, ...); see [`FlatConfig`].

mod flat;
mod types;
mod validate;

pub use flat::FlatConfig;

pub use types::*;

use crate::error::ConfigError;
use crate::pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Input and output folders
    pub paths: PathsConfig,

    /// Worker pool and discovery settings
    pub processing: ProcessingConfig,

    /// Resize target
    pub resize: ResizeConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Run report settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let dir = path.parent();
        let (mut config, base) = if is_json {
            let value: serde_json::Value = serde_json::from_str(&content)?;
            if FlatConfig::detect(&value) {
                tracing::debug!("Reading flat config layout from {:?}", path);
                let flat: FlatConfig = serde_json::from_value(value)?;
                // Flat files live in `<root>/conf/`; their paths are relative to `<root>`.
                let root = dir.and_then(Path::parent).or(dir);
                (flat.into_config(), root)
            } else {
                (serde_json::from_value(value)?, dir)
            }
        } else {
            (toml::from_str(&content)?, dir)
        };

        if let Some(base) = base {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.resizer.resizer/config.toml
    /// - Linux: ~/.config/resizer/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\resizer\config\config.toml
    ///
    /// Falls back to ~/.resizer/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "resizer", "resizer")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".resizer").join("config.toml")
            })
    }

    /// Expand `~` and anchor relative paths at `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| resolve_path(base, p);

        self.paths.source_folder = resolve(&self.paths.source_folder);
        self.paths.destination_folder = resolve(&self.paths.destination_folder);
        if let Some(report) = &self.output.report {
            self.output.report = Some(resolve(report));
        }
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(resolve(file));
        }
    }

    /// Source folder with `~` expanded.
    pub fn source_folder(&self) -> PathBuf {
        expand_tilde(&self.paths.source_folder)
    }

    /// Destination folder with `~` expanded.
    pub fn destination_folder(&self) -> PathBuf {
        expand_tilde(&self.paths.destination_folder)
    }

    /// Worker pool parameters derived from `[processing]`.
    pub fn pool_config(&self) -> PoolConfig {
        let config = PoolConfig::new(self.processing.parallel_workers)
            .with_thread_name_prefix("resize");
        match self.processing.queue_capacity() {
            Some(capacity) => config.with_queue_capacity(capacity),
            None => config,
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
