//! Flat JSON layout used by earlier releases of the resizer.
//!
//! ```json
//! {
//!     "source_folder": "data/input",
//!     "destination_folder": "data/output",
//!     "number_of_threads": 4,
//!     "resize_width": 800,
//!     "resize_height": 600,
//!     "log_file": "logs/app.log"
//! }
//! ```

use serde::Deserialize;
use std::path::PathBuf;

use super::Config;

/// Top-level keys that only exist in the flat layout.
const FLAT_KEYS: &[&str] = &[
    "source_folder",
    "destination_folder",
    "number_of_threads",
    "resize_width",
    "resize_height",
    "log_file",
];

/// Flat configuration. Every key is optional; missing keys keep the
/// [`Config`] defaults and unknown keys are an error.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlatConfig {
    pub source_folder: Option<PathBuf>,
    pub destination_folder: Option<PathBuf>,
    pub number_of_threads: Option<usize>,
    pub resize_width: Option<u32>,
    pub resize_height: Option<u32>,
    pub log_file: Option<PathBuf>,
}

impl FlatConfig {
    /// Whether a parsed JSON document uses the flat layout.
    pub fn detect(value: &serde_json::Value) -> bool {
        value
            .as_object()
            .is_some_and(|map| map.keys().any(|key| FLAT_KEYS.contains(&key.as_str())))
    }

    /// Map onto the sectioned config.
    pub fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(source) = self.source_folder {
            config.paths.source_folder = source;
        }
        if let Some(destination) = self.destination_folder {
            config.paths.destination_folder = destination;
        }
        if let Some(threads) = self.number_of_threads {
            config.processing.parallel_workers = threads;
        }
        if let Some(width) = self.resize_width {
            config.resize.width = width;
        }
        if let Some(height) = self.resize_height {
            config.resize.height = height;
        }
        if let Some(file) = self.log_file {
            config.logging.file = Some(file);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect() {
        assert!(FlatConfig::detect(&json!({ "number_of_threads": 2 })));
        assert!(!FlatConfig::detect(&json!({ "processing": { "parallel_workers": 2 } })));
        assert!(!FlatConfig::detect(&json!({})));
        assert!(!FlatConfig::detect(&json!([1, 2])));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let flat: FlatConfig =
            serde_json::from_value(json!({ "source_folder": "data/input", "number_of_threads": 4 }))
                .unwrap();
        let config = flat.into_config();
        assert_eq!(config.paths.source_folder, PathBuf::from("data/input"));
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!((config.resize.width, config.resize.height), (800, 600));
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = serde_json::from_value::<FlatConfig>(json!({
            "number_of_threads": 2,
            "thread_count": 8
        }))
        .unwrap_err();
        assert!(err.to_string().contains("thread_count"));
    }
}
