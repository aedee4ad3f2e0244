//! Error types for the batch resizer.
//!
//! Errors are split by blast radius: [`TransformError`] describes a single file
//! that could not be resized and is always reported as a per-task result, while
//! [`PoolError`] and [`ConfigError`] are structural and abort the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for resizer operations.
#[derive(Error, Debug)]
pub enum ResizerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse JSON configuration
    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Structural errors raised by the worker pool and its queue.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Bad construction arguments, e.g. a zero worker count
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called on a pool that already left the Created state
    #[error("Pool has already been started")]
    AlreadyStarted,

    /// Submission attempted while the pool is not accepting work
    #[error("Pool is not running")]
    PoolNotRunning,

    /// Push attempted on a closed queue
    #[error("Task queue is closed")]
    QueueClosed,

    /// Tasks remain queued but every worker has died
    #[error("Pool stalled: {remaining} task(s) left with no live workers ({workers_lost} worker(s) lost)")]
    PoolStalled { remaining: usize, workers_lost: usize },

    /// The OS refused to spawn a worker thread
    #[error("Failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single file could not be resized.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Source file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Writing the resized image failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Filesystem error around the transform (creating directories, etc.)
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Free-form failure reported by a caller-supplied transform
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for resizer results.
pub type Result<T> = std::result::Result<T, ResizerError>;

/// Convenience type alias for pool results.
pub type PoolResult<T> = std::result::Result<T, PoolError>;
