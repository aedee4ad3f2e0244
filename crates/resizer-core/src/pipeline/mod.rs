//! Resize pipeline components used around the worker pool.
//!
//! - **discovery**: find image files and plan one task per file
//! - **validate**: pre-decode checks (existence, size, signature)
//! - **resize**: the [`Transform`](crate::pool::Transform) the workers run

pub mod discovery;
pub mod resize;
pub mod validate;

// Re-exports for convenient access
pub use discovery::{DiscoveredFile, FileDiscovery, TaskPlan};
pub use resize::{resize_image, ImageResizer};
pub use validate::Validator;
