//! Fixed-size worker pool for per-file transforms.
//!
//! ```text
//! producer ──submit──▶ TaskQueue ──pop──▶ worker-0..N ──▶ result channel ──▶ results()
//!                          ▲                   │
//!                          └─── ShutdownSignal ┘
//! ```
//!
//! - **queue**: blocking FIFO with close-then-drain semantics
//! - **shutdown**: per-pool cancellation token
//! - **transform**: the function each worker applies to a task
//! - **worker**: the pop/transform/report loop and its panic boundary
//! - **manager**: pool lifecycle, submission, drain and hard stop
//! - **result**: per-task results and the pool summary

pub mod manager;
pub mod queue;
pub mod result;
pub mod shutdown;
pub mod transform;
pub mod worker;

pub use manager::{PoolConfig, PoolState, WorkerPool};
pub use queue::{Pop, TaskQueue, TryPushError};
pub use result::{Outcome, PoolSummary, Results, TaskResult};
pub use shutdown::{ShutdownSignal, ShutdownState, StopMode};
pub use transform::Transform;
