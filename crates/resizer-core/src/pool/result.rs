//! Per-task results and the pool-level summary.

use crossbeam_channel::Receiver;
use std::time::Duration;

use crate::types::{Task, TaskId};

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure {
        reason: String,
        /// The transform panicked and was caught at the worker boundary
        panicked: bool,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Result emitted by a worker for every task it popped.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub id: TaskId,
    pub task: Task,
    pub outcome: Outcome,
    /// Wall time spent in the transform
    pub duration: Duration,
    /// Worker that processed the task
    pub worker: usize,
}

/// Lazy, finite stream of results in completion order.
///
/// Iteration blocks until the next result arrives and ends once every worker
/// has exited. The stream cannot be restarted.
pub struct Results {
    receiver: Option<Receiver<TaskResult>>,
}

impl Results {
    pub(crate) fn new(receiver: Receiver<TaskResult>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    pub(crate) fn empty() -> Self {
        Self { receiver: None }
    }

    /// Take a result if one is ready, without blocking.
    pub fn try_next(&mut self) -> Option<TaskResult> {
        self.receiver.as_ref()?.try_recv().ok()
    }
}

impl Iterator for Results {
    type Item = TaskResult;

    fn next(&mut self) -> Option<Self::Item> {
        let received = self.receiver.as_ref()?.recv().ok();
        if received.is_none() {
            self.receiver = None;
        }
        received
    }
}

/// Counters reported when a pool stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    /// Tasks accepted by `submit`
    pub submitted: u64,
    /// Tasks a worker finished (success or failure)
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Failures caused by a caught panic (included in `failed`)
    pub panicked: u64,
    /// Tasks dropped from the queue by a hard stop
    pub abandoned: u64,
    /// Worker threads that died outside the catch boundary
    pub workers_lost: u64,
}

impl PoolSummary {
    /// Whether every submitted task was processed and succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.submitted && self.workers_lost == 0
    }
}
