//! Resizer Core - batch image resizing on a fixed pool of worker threads.
//!
//! A caller submits resize tasks to a [`WorkerPool`]; a fixed set of worker
//! threads pulls them from a shared queue, runs a [`Transform`] on each, and
//! emits one [`TaskResult`] per task. A failing or panicking task never takes
//! down its worker or its siblings.
//!
//! # Architecture
//!
//! ```text
//! Config → Discover files → Plan tasks → WorkerPool(ImageResizer) → Results → Report
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use resizer_core::{ImageResizer, LimitsConfig, PoolConfig, ResizeParams, Task, WorkerPool};
//!
//! fn main() -> resizer_core::Result<()> {
//!     let resizer = Arc::new(ImageResizer::new(LimitsConfig::default()));
//!     let pool = WorkerPool::spawn(PoolConfig::new(4), resizer)?;
//!
//!     pool.submit(Task::new("in/a.jpg", "out/a.jpg", ResizeParams::new(800, 600)))?;
//!     let results = pool.results();
//!     let summary = pool.drain_and_stop()?;
//!
//!     for result in results {
//!         println!("{} {:?}", result.id, result.outcome);
//!     }
//!     println!("{} succeeded", summary.succeeded);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, LimitsConfig, ProcessingConfig};
pub use error::{ConfigError, PoolError, PoolResult, ResizerError, Result, TransformError};
pub use output::{OutputFormat, OutputWriter, ResultRecord};
pub use pipeline::{FileDiscovery, ImageResizer, TaskPlan};
pub use pool::{
    Outcome, PoolConfig, PoolState, PoolSummary, Results, StopMode, TaskResult, Transform,
    WorkerPool,
};
pub use types::{ResizeFilter, ResizeMode, ResizeParams, Task, TaskId};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
