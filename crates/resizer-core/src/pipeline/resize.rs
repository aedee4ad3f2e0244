//! Image resize transform backed by the `image` crate.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::TransformError;
use crate::pool::Transform;
use crate::types::{ResizeMode, ResizeParams};

use super::validate::Validator;

/// Reads an image, resizes it, and writes it to the destination.
///
/// Stateless apart from its limits, so one instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    validator: Validator,
}

impl ImageResizer {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits),
        }
    }

    fn decode(&self, source: &Path) -> Result<DynamicImage, TransformError> {
        let reader = image::ImageReader::open(source)
            .map_err(|source_err| TransformError::Io {
                path: source.to_path_buf(),
                source: source_err,
            })?
            .with_guessed_format()
            .map_err(|e| TransformError::Decode {
                path: source.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;

        reader.decode().map_err(|e| TransformError::Decode {
            path: source.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        source: &Path,
        destination: &Path,
    ) -> Result<(), TransformError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TransformError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Keep the source format when the destination has no usable extension.
        let format = ImageFormat::from_path(destination)
            .or_else(|_| ImageFormat::from_path(source))
            .map_err(|_| TransformError::UnsupportedFormat {
                path: destination.to_path_buf(),
                format: destination
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?;

        let image = match format {
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => image.clone(),
        };

        image
            .save_with_format(destination, format)
            .map_err(|e| TransformError::Encode {
                path: destination.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// Apply the resize parameters to a decoded image.
pub fn resize_image(image: &DynamicImage, params: &ResizeParams) -> DynamicImage {
    let filter = params.filter.to_image_filter();
    match params.mode {
        ResizeMode::Exact => image.resize_exact(params.width, params.height, filter),
        ResizeMode::Fit => image.resize(params.width, params.height, filter),
    }
}

impl Transform for ImageResizer {
    fn apply(
        &self,
        source: &Path,
        destination: &Path,
        params: &ResizeParams,
    ) -> Result<(), TransformError> {
        self.validator.validate(source)?;
        let decoded = self.decode(source)?;
        let resized = resize_image(&decoded, params);
        let (from_w, from_h) = decoded.dimensions();
        let (to_w, to_h) = resized.dimensions();
        tracing::trace!("Resized {:?} {}x{} -> {}x{}", source, from_w, from_h, to_w, to_h);
        self.encode(&resized, source, destination)
    }
}
