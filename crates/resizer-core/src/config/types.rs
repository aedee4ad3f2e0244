//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{ResizeFilter, ResizeMode, ResizeParams};

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Folder scanned for images
    pub source_folder: PathBuf,

    /// Folder resized images are written to
    pub destination_folder: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("data/input"),
            destination_folder: PathBuf::from("data/output"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Number of worker threads
    pub parallel_workers: usize,

    /// Maximum queued tasks (0 = unbounded)
    pub queue_capacity: usize,

    /// Supported input extensions
    pub supported_formats: Vec<String>,

    /// Descend into subfolders of the source folder
    pub recursive: bool,

    /// Skip files whose destination already exists
    pub skip_existing: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            queue_capacity: 0,
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            recursive: false,
            skip_existing: false,
        }
    }
}

impl ProcessingConfig {
    /// Queue capacity as the pool expects it.
    pub fn queue_capacity(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }
}

/// Resize target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,

    /// "exact" stretches, "fit" keeps aspect ratio
    pub mode: ResizeMode,

    /// Resampling filter
    pub filter: ResizeFilter,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let params = ResizeParams::default();
        Self {
            width: params.width,
            height: params.height,
            mode: params.mode,
            filter: params.filter,
        }
    }
}

impl ResizeConfig {
    pub fn params(&self) -> ResizeParams {
        ResizeParams {
            width: self.width,
            height: self.height,
            mode: self.mode,
            filter: self.filter,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
        }
    }
}

/// Run report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Where to write the per-file report (none = no report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,

    /// Report format: "json" or "jsonl"
    pub format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report: None,
            format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,

    /// Additional log file (none = stderr only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}
