//! Worker pool manager - owns the queue, the shutdown signal and the workers.
//!
//! The pool is responsible for:
//! - Spawning a fixed number of worker threads bound to one transform
//! - Accepting submissions while Running
//! - Graceful drain (`drain_and_stop`) and hard cancel (`stop_now`)
//! - Detecting a stalled pool (queued work, no live workers)
//! - Aggregating worker statistics into a [`PoolSummary`]

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::queue::TaskQueue;
use super::result::{PoolSummary, Results, TaskResult};
use super::shutdown::{ShutdownSignal, StopMode};
use super::transform::Transform;
use super::worker::{Liveness, QueuedTask, Worker, WorkerContext};
use crate::error::{PoolError, PoolResult};
use crate::types::{Task, TaskId};

/// Construction parameters for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Maximum queued tasks; `None` for an unbounded queue
    pub queue_capacity: Option<usize>,
    /// Worker thread names are `{prefix}-{id}`
    pub thread_name_prefix: String,
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: None,
            thread_name_prefix: "worker".to_string(),
        }
    }
}

/// Lifecycle of a pool. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Queue open, no workers yet
    Created,
    /// Workers running, submissions accepted
    Running,
    /// Queue closed, workers finishing
    Draining,
    /// Every worker joined
    Stopped,
}

struct Control {
    state: PoolState,
    workers: Vec<Worker>,
    results_tx: Option<Sender<TaskResult>>,
    summary: Option<PoolSummary>,
}

/// Fixed-size pool of worker threads fed by a shared blocking queue.
///
/// All operations take `&self`, so producers on other threads can submit
/// through a shared reference while the owner drains.
pub struct WorkerPool {
    config: PoolConfig,
    queue: Arc<TaskQueue<QueuedTask>>,
    signal: ShutdownSignal,
    liveness: Arc<Liveness>,
    control: Mutex<Control>,
    /// Serializes stop operations so only one caller joins the workers
    stop_lock: Mutex<()>,
    results_rx: Mutex<Option<Receiver<TaskResult>>>,
    next_id: AtomicU64,
}

impl WorkerPool {
    /// Create a pool in the Created state. No threads are spawned yet.
    pub fn new(config: PoolConfig) -> Self {
        let queue = match config.queue_capacity {
            Some(capacity) => TaskQueue::bounded(capacity),
            None => TaskQueue::unbounded(),
        };
        let (results_tx, results_rx) = crossbeam_channel::unbounded();

        Self {
            config,
            queue: Arc::new(queue),
            signal: ShutdownSignal::new(),
            liveness: Arc::new(Liveness::default()),
            control: Mutex::new(Control {
                state: PoolState::Created,
                workers: Vec::new(),
                results_tx: Some(results_tx),
                summary: None,
            }),
            stop_lock: Mutex::new(()),
            results_rx: Mutex::new(Some(results_rx)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a pool and start it in one step.
    pub fn spawn(config: PoolConfig, transform: Arc<dyn Transform>) -> PoolResult<Self> {
        let pool = Self::new(config);
        pool.start(transform)?;
        Ok(pool)
    }

    /// Spawn the workers and move to Running.
    pub fn start(&self, transform: Arc<dyn Transform>) -> PoolResult<()> {
        if self.config.workers == 0 {
            return Err(PoolError::InvalidConfig(
                "worker count must be > 0".to_string(),
            ));
        }

        let mut control = self.control.lock();
        if control.state != PoolState::Created {
            return Err(PoolError::AlreadyStarted);
        }
        let Some(results_tx) = control.results_tx.take() else {
            return Err(PoolError::AlreadyStarted);
        };

        for id in 0..self.config.workers {
            self.liveness.register();
            let ctx = WorkerContext {
                queue: Arc::clone(&self.queue),
                transform: Arc::clone(&transform),
                signal: self.signal.clone(),
                results: results_tx.clone(),
                liveness: Arc::clone(&self.liveness),
            };

            match Worker::spawn(id, &self.config.thread_name_prefix, ctx) {
                Ok(worker) => control.workers.push(worker),
                Err(e) => {
                    // The unspawned worker never runs its guard.
                    self.liveness.deregister(false);
                    error!(worker = id, error = %e, "Failed to spawn worker");
                    drop(results_tx);
                    self.abort_start(&mut control);
                    return Err(e);
                }
            }
        }

        control.state = PoolState::Running;
        info!(
            workers = self.config.workers,
            capacity = ?self.config.queue_capacity,
            "Worker pool started"
        );
        Ok(())
    }

    /// Tear down workers spawned by a failed `start`.
    fn abort_start(&self, control: &mut Control) {
        self.signal.request(StopMode::Hard);
        self.queue.close();
        for worker in control.workers.drain(..) {
            worker.join();
        }
        self.signal.mark_stopped();
        control.state = PoolState::Stopped;
        control.summary = Some(PoolSummary::default());
    }

    /// Enqueue a task. Fails with [`PoolError::PoolNotRunning`] unless the
    /// pool is Running.
    ///
    /// On a bounded queue this blocks while the queue is full. Fails with
    /// [`PoolError::PoolStalled`] once every worker has died, including while
    /// blocked on a full queue.
    pub fn submit(&self, task: Task) -> PoolResult<TaskId> {
        if self.state() != PoolState::Running {
            return Err(PoolError::PoolNotRunning);
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.queue.push(QueuedTask { id, task }) {
            Ok(()) => {
                debug!(task = %id, "Task submitted");
                Ok(id)
            }
            Err(PoolError::QueueClosed) => Err(PoolError::PoolNotRunning),
            Err(PoolError::PoolStalled { remaining, .. }) => Err(PoolError::PoolStalled {
                remaining,
                workers_lost: self.liveness.lost() as usize,
            }),
            Err(e) => Err(e),
        }
    }

    /// Close the queue, let the workers finish every queued task, and join them.
    ///
    /// Fails with [`PoolError::PoolStalled`] if tasks are still queued once no
    /// worker is alive to take them, or if every worker died while the queue
    /// was still open. On a pool that never started this simply
    /// moves to Stopped; on an already stopped pool it returns the recorded
    /// summary.
    pub fn drain_and_stop(&self) -> PoolResult<PoolSummary> {
        self.stop(StopMode::Graceful)
    }

    /// Hard cancel: workers finish their in-flight task but pop nothing else.
    ///
    /// Queued tasks are discarded without results and counted as abandoned.
    pub fn stop_now(&self) -> PoolResult<PoolSummary> {
        self.stop(StopMode::Hard)
    }

    fn stop(&self, mode: StopMode) -> PoolResult<PoolSummary> {
        let _stopping = self.stop_lock.lock();

        let workers = {
            let mut control = self.control.lock();
            match control.state {
                PoolState::Stopped => {
                    return Ok(control.summary.unwrap_or_default());
                }
                PoolState::Created => {
                    control.results_tx = None;
                    control.state = PoolState::Stopped;
                    self.queue.close();
                    self.signal.request(mode);
                    self.signal.mark_stopped();
                    let summary = PoolSummary::default();
                    control.summary = Some(summary);
                    return Ok(summary);
                }
                PoolState::Running | PoolState::Draining => {
                    control.state = PoolState::Draining;
                    std::mem::take(&mut control.workers)
                }
            }
        };

        let abandoned = match mode {
            StopMode::Graceful => {
                self.signal.request(mode);
                self.queue.close();
                0
            }
            StopMode::Hard => {
                // Nothing can be popped once this returns; only in-flight tasks finish.
                let dropped = self.queue.close_and_discard().len() as u64;
                self.signal.request(mode);
                if dropped > 0 {
                    warn!(abandoned = dropped, "Hard stop discarded queued tasks");
                }
                dropped
            }
        };

        info!(
            workers = workers.len(),
            queued = self.queue.len(),
            "Waiting for workers to finish"
        );
        self.liveness.wait_all_exited();

        let mut summary = PoolSummary {
            submitted: self.queue.total_pushed(),
            abandoned,
            ..PoolSummary::default()
        };
        for worker in workers {
            let stats = worker.stats();
            summary.processed += stats.processed.load(Ordering::Relaxed);
            summary.succeeded += stats.succeeded.load(Ordering::Relaxed);
            summary.failed += stats.failed.load(Ordering::Relaxed);
            summary.panicked += stats.panicked.load(Ordering::Relaxed);

            let id = worker.id();
            if !worker.join() {
                warn!(worker = id, "Worker thread terminated by panic");
            }
        }
        summary.workers_lost = self.liveness.lost();

        // Stalled tasks are unreachable now; drop them so the queue is empty.
        let remaining = self.queue.discard_pending().len();
        let stalled = remaining > 0 || self.queue.is_stalled();

        self.signal.mark_stopped();
        {
            let mut control = self.control.lock();
            control.state = PoolState::Stopped;
            control.summary = Some(summary);
        }

        if stalled {
            error!(
                remaining,
                workers_lost = summary.workers_lost,
                "Pool stalled with queued tasks and no live workers"
            );
            return Err(PoolError::PoolStalled {
                remaining,
                workers_lost: summary.workers_lost as usize,
            });
        }

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Worker pool stopped"
        );
        Ok(summary)
    }

    /// Results in completion order.
    ///
    /// The first call takes the stream; later calls get an empty iterator.
    pub fn results(&self) -> Results {
        match self.results_rx.lock().take() {
            Some(receiver) => Results::new(receiver),
            None => Results::empty(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.control.lock().state
    }

    /// Worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.liveness.live()
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Shutdown signal shared with the workers.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if matches!(self.state(), PoolState::Running | PoolState::Draining) {
            debug!("Draining worker pool on drop");
            if let Err(e) = self.drain_and_stop() {
                error!(error = %e, "Worker pool failed to drain on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::types::ResizeParams;
    use std::path::Path;

    fn noop() -> Arc<dyn Transform> {
        Arc::new(|_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> { Ok(()) })
    }

    fn task(n: usize) -> Task {
        Task::new(
            format!("in/{}.png", n),
            format!("out/{}.png", n),
            ResizeParams::default(),
        )
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::new(3)
            .with_queue_capacity(16)
            .with_thread_name_prefix("resize");
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, Some(16));
        assert_eq!(config.thread_name_prefix, "resize");
    }

    #[test]
    fn test_zero_workers_is_invalid() {
        let pool = WorkerPool::new(PoolConfig::new(0));
        assert!(matches!(
            pool.start(noop()),
            Err(PoolError::InvalidConfig(_))
        ));
        assert_eq!(pool.state(), PoolState::Created);
    }

    #[test]
    fn test_submit_before_start_fails() {
        let pool = WorkerPool::new(PoolConfig::new(1));
        assert!(matches!(
            pool.submit(task(0)),
            Err(PoolError::PoolNotRunning)
        ));
    }

    #[test]
    fn test_start_twice_fails() {
        let pool = WorkerPool::spawn(PoolConfig::new(1), noop()).unwrap();
        assert!(matches!(pool.start(noop()), Err(PoolError::AlreadyStarted)));
        pool.drain_and_stop().unwrap();
    }

    #[test]
    fn test_lifecycle_states() {
        let pool = WorkerPool::new(PoolConfig::new(2));
        assert_eq!(pool.state(), PoolState::Created);

        pool.start(noop()).unwrap();
        assert_eq!(pool.state(), PoolState::Running);
        assert_eq!(pool.live_workers(), 2);

        pool.submit(task(0)).unwrap();
        let summary = pool.drain_and_stop().unwrap();
        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(pool.live_workers(), 0);
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(summary.all_succeeded());

        assert!(matches!(
            pool.start(noop()),
            Err(PoolError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_drain_unstarted_pool() {
        let pool = WorkerPool::new(PoolConfig::new(2));
        let summary = pool.drain_and_stop().unwrap();
        assert_eq!(summary, PoolSummary::default());
        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(pool.results().count(), 0);
    }

    #[test]
    fn test_drain_twice_returns_recorded_summary() {
        let pool = WorkerPool::spawn(PoolConfig::new(2), noop()).unwrap();
        for n in 0..3 {
            pool.submit(task(n)).unwrap();
        }
        let first = pool.drain_and_stop().unwrap();
        let second = pool.drain_and_stop().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.processed, 3);
    }

    #[test]
    fn test_task_ids_follow_submission_order() {
        let pool = WorkerPool::spawn(PoolConfig::new(1), noop()).unwrap();
        let ids: Vec<_> = (0..3).map(|n| pool.submit(task(n)).unwrap()).collect();
        assert_eq!(ids, vec![TaskId(0), TaskId(1), TaskId(2)]);
        pool.drain_and_stop().unwrap();
    }

    #[test]
    fn test_results_taken_once() {
        let pool = WorkerPool::spawn(PoolConfig::new(1), noop()).unwrap();
        pool.submit(task(0)).unwrap();
        pool.drain_and_stop().unwrap();

        assert_eq!(pool.results().count(), 1);
        assert_eq!(pool.results().count(), 0);
    }

    #[test]
    fn test_drop_drains_running_pool() {
        let pool = WorkerPool::spawn(PoolConfig::new(2), noop()).unwrap();
        for n in 0..5 {
            pool.submit(task(n)).unwrap();
        }
        let results = pool.results();
        drop(pool);
        assert_eq!(results.count(), 5);
    }
}
