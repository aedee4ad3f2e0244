//! Core data types shared by the pool and the resize pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier the pool assigns to every accepted task, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the target dimensions are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Stretch to exactly `width` x `height`
    #[default]
    Exact,
    /// Scale down or up to fit inside `width` x `height`, keeping aspect ratio
    Fit,
}

/// Sampling filter used when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    /// Map to the `image` crate's filter type.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Parameters handed to the transform for every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeParams {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// How the dimensions are applied
    pub mode: ResizeMode,
    /// Resampling filter
    pub filter: ResizeFilter,
}

impl ResizeParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mode: ResizeMode::default(),
            filter: ResizeFilter::default(),
        }
    }
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// One file to resize.
///
/// A task is immutable once built: the producer creates it, the pool moves it
/// through the queue to exactly one worker, and the worker hands it back inside
/// the [`TaskResult`](crate::pool::TaskResult).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    source: PathBuf,
    destination: PathBuf,
    params: ResizeParams,
}

impl Task {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        params: ResizeParams,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            params,
        }
    }

    /// Path of the image to read.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path the resized image is written to.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn params(&self) -> &ResizeParams {
        &self.params
    }

    /// File name of the source, for log lines.
    pub fn file_name(&self) -> &str {
        self.source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }
}
