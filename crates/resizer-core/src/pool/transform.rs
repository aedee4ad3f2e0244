//! The per-task transform the workers invoke.

use std::path::Path;

use crate::error::TransformError;
use crate::types::ResizeParams;

/// A function applied to every task.
///
/// Implementations are called concurrently from every worker thread, so they
/// must not rely on shared mutable state across invocations.
pub trait Transform: Send + Sync {
    fn apply(
        &self,
        source: &Path,
        destination: &Path,
        params: &ResizeParams,
    ) -> Result<(), TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&Path, &Path, &ResizeParams) -> Result<(), TransformError> + Send + Sync,
{
    fn apply(
        &self,
        source: &Path,
        destination: &Path,
        params: &ResizeParams,
    ) -> Result<(), TransformError> {
        self(source, destination, params)
    }
}
