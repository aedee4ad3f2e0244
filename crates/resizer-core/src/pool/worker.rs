//! Worker thread logic.
//!
//! Each worker:
//! - Pops tasks from the shared queue until it reports `Closed`
//! - Runs the transform inside a panic boundary
//! - Sends one [`TaskResult`] per popped task to the result channel
//! - Exits early, between tasks, when a hard stop is requested

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::queue::{Pop, TaskQueue};
use super::result::{Outcome, TaskResult};
use super::shutdown::ShutdownSignal;
use super::transform::Transform;
use crate::error::PoolError;
use crate::types::{Task, TaskId};

/// A task as it travels through the queue.
#[derive(Debug)]
pub(crate) struct QueuedTask {
    pub id: TaskId,
    pub task: Task,
}

/// Counters collected by a worker.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub processed: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub panicked: AtomicU64,
}

impl WorkerStats {
    fn record(&self, outcome: &Outcome) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Success => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failure { panicked, .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if *panicked {
                    self.panicked.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Count of worker threads that are still running.
///
/// The pool registers a worker before spawning it; the worker's
/// [`LiveGuard`] deregisters it on exit, including exit by unwinding.
#[derive(Debug, Default)]
pub(crate) struct Liveness {
    live: Mutex<usize>,
    exited: Condvar,
    lost: AtomicU64,
}

impl Liveness {
    pub fn register(&self) {
        *self.live.lock() += 1;
    }

    /// Returns the number of workers still alive.
    pub fn deregister(&self, lost: bool) -> usize {
        if lost {
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
        let mut live = self.live.lock();
        *live = live.saturating_sub(1);
        let remaining = *live;
        drop(live);
        self.exited.notify_all();
        remaining
    }

    pub fn live(&self) -> usize {
        *self.live.lock()
    }

    /// Workers that died by an escaped panic.
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    /// Block until every registered worker has exited.
    pub fn wait_all_exited(&self) {
        let mut live = self.live.lock();
        while *live > 0 {
            self.exited.wait(&mut live);
        }
    }
}

/// Deregisters a worker when its thread ends.
///
/// Workers only exit normally once the queue is closed, so the last worker
/// dying by panic means the queue has no consumer left.
struct LiveGuard {
    id: usize,
    liveness: Arc<Liveness>,
    queue: Arc<TaskQueue<QueuedTask>>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        let lost = thread::panicking();
        if lost {
            error!(worker = self.id, "Worker died outside the task boundary");
        }
        let remaining = self.liveness.deregister(lost);
        if lost && remaining == 0 {
            error!(
                queued = self.queue.len(),
                "Last worker died; failing producers waiting on the queue"
            );
            self.queue.mark_stalled();
        }
    }
}

/// Everything a worker thread needs, moved into the thread at spawn.
pub(crate) struct WorkerContext {
    pub queue: Arc<TaskQueue<QueuedTask>>,
    pub transform: Arc<dyn Transform>,
    pub signal: ShutdownSignal,
    pub results: Sender<TaskResult>,
    pub liveness: Arc<Liveness>,
}

/// Handle to a spawned worker thread.
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker thread named `{prefix}-{id}`.
    ///
    /// The caller must have registered the worker with the liveness counter.
    pub(crate) fn spawn(id: usize, prefix: &str, ctx: WorkerContext) -> Result<Self, PoolError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("{}-{}", prefix, id))
            .spawn(move || {
                let _guard = LiveGuard {
                    id,
                    liveness: Arc::clone(&ctx.liveness),
                    queue: Arc::clone(&ctx.queue),
                };
                worker_loop(id, ctx, &stats_clone);
            })
            .map_err(|source| PoolError::Spawn { id, source })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the thread to finish. Returns `false` if it panicked.
    pub fn join(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

fn worker_loop(id: usize, ctx: WorkerContext, stats: &WorkerStats) {
    info!(worker = id, "Worker started");

    loop {
        if ctx.signal.is_hard_stop() {
            debug!(worker = id, "Hard stop requested, not popping further tasks");
            break;
        }

        let QueuedTask { id: task_id, task } = match ctx.queue.pop() {
            Pop::Item(queued) => queued,
            Pop::Closed => break,
        };

        let result = run_task(id, task_id, task, ctx.transform.as_ref());
        stats.record(&result.outcome);

        if ctx.results.send(result).is_err() {
            debug!(worker = id, task = %task_id, "Result receiver dropped");
        }
    }

    info!(
        worker = id,
        processed = stats.processed.load(Ordering::Relaxed),
        stop_requested = ctx.signal.is_requested(),
        "Worker finished"
    );
}

/// Run one task inside the panic boundary and build its result.
fn run_task(worker: usize, id: TaskId, task: Task, transform: &dyn Transform) -> TaskResult {
    debug!(worker, task = %id, "Processing {}", task.file_name());
    let start = Instant::now();

    let caught = panic::catch_unwind(AssertUnwindSafe(|| {
        transform.apply(task.source(), task.destination(), task.params())
    }));

    let outcome = match caught {
        Ok(Ok(())) => {
            debug!(worker, task = %id, "Finished {}", task.file_name());
            Outcome::Success
        }
        Ok(Err(e)) => {
            warn!(worker, task = %id, "Error processing {}: {}", task.file_name(), e);
            Outcome::Failure {
                reason: e.to_string(),
                panicked: false,
            }
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(worker, task = %id, "Transform panicked on {}: {}", task.file_name(), reason);
            Outcome::Failure {
                reason: format!("transform panicked: {}", reason),
                panicked: true,
            }
        }
    };

    TaskResult {
        id,
        task,
        outcome,
        duration: start.elapsed(),
        worker,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
