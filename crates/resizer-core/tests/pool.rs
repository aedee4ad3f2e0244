//! Worker pool behaviour under real threads: delivery, ordering, failure
//! isolation, shutdown and stall detection.

use rand::Rng;
use resizer_core::pool::ShutdownState;
use resizer_core::{
    ImageResizer, LimitsConfig, Outcome, PoolConfig, PoolError, PoolState, ResizeParams, Task,
    TaskId, TaskResult, Transform, TransformError, WorkerPool,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn task(n: usize) -> Task {
    Task::new(
        format!("in/{n}.png"),
        format!("out/{n}.png"),
        ResizeParams::default(),
    )
}

fn noop() -> Arc<dyn Transform> {
    Arc::new(|_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> { Ok(()) })
}

fn ids(results: &[TaskResult]) -> Vec<TaskId> {
    results.iter().map(|r| r.id).collect()
}

#[test]
fn every_submitted_task_yields_exactly_one_result() {
    let pool = WorkerPool::spawn(PoolConfig::new(4), noop()).unwrap();
    let results = pool.results();

    for n in 0..100 {
        pool.submit(task(n)).unwrap();
    }
    let summary = pool.drain_and_stop().unwrap();

    let collected: Vec<_> = results.collect();
    assert_eq!(collected.len(), 100);
    let unique: HashSet<_> = ids(&collected).into_iter().collect();
    assert_eq!(unique.len(), 100);

    assert_eq!(summary.submitted, 100);
    assert_eq!(summary.processed, 100);
    assert!(summary.all_succeeded());
}

#[test]
fn single_worker_preserves_submission_order() {
    let pool = WorkerPool::spawn(PoolConfig::new(1), noop()).unwrap();
    let submitted: Vec<_> = (0..50).map(|n| pool.submit(task(n)).unwrap()).collect();
    pool.drain_and_stop().unwrap();

    let collected: Vec<_> = pool.results().collect();
    assert_eq!(ids(&collected), submitted);
}

#[test]
fn submit_after_drain_is_rejected() {
    let pool = WorkerPool::spawn(PoolConfig::new(2), noop()).unwrap();
    pool.submit(task(0)).unwrap();
    pool.drain_and_stop().unwrap();

    assert!(matches!(
        pool.submit(task(1)),
        Err(PoolError::PoolNotRunning)
    ));
    assert_eq!(pool.results().count(), 1);
}

#[test]
fn failing_transform_reports_every_task() {
    let failing: Arc<dyn Transform> = Arc::new(
        |source: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            Err(TransformError::Other(format!("cannot read {}", source.display())))
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(2), failing).unwrap();
    for n in 0..5 {
        pool.submit(task(n)).unwrap();
    }
    let summary = pool.drain_and_stop().unwrap();

    let collected: Vec<_> = pool.results().collect();
    assert_eq!(collected.len(), 5);
    for result in &collected {
        match &result.outcome {
            Outcome::Failure { reason, panicked } => {
                assert!(reason.contains("cannot read"));
                assert!(!panicked);
            }
            Outcome::Success => panic!("task {} unexpectedly succeeded", result.id),
        }
    }
    assert_eq!(summary.failed, 5);
    assert_eq!(summary.workers_lost, 0);
}

#[test]
fn panicking_task_does_not_take_down_the_pool() {
    let flaky: Arc<dyn Transform> = Arc::new(
        |source: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            if source == Path::new("in/7.png") {
                panic!("corrupt header");
            }
            Ok(())
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(3), flaky).unwrap();
    for n in 0..10 {
        pool.submit(task(n)).unwrap();
    }
    let summary = pool.drain_and_stop().unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);

    let collected: Vec<_> = pool.results().collect();
    assert_eq!(collected.len(), 10);

    let failures: Vec<_> = collected
        .iter()
        .filter(|r| !r.outcome.is_success())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, TaskId(7));
    assert!(failures[0]
        .outcome
        .reason()
        .is_some_and(|r| r.contains("corrupt header")));

    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.panicked, 1);
    assert_eq!(summary.workers_lost, 0);
}

/// Panic payload whose destructor panics again, after the worker has already
/// caught the first panic. The second panic escapes and kills the worker.
struct Bomb;

impl Drop for Bomb {
    fn drop(&mut self) {
        panic!("payload exploded");
    }
}

fn explosive() -> Arc<dyn Transform> {
    Arc::new(
        |_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            std::panic::panic_any(Bomb)
        },
    )
}

/// Submit until the pool refuses; only a stall may refuse.
fn submit_until_stalled(pool: &WorkerPool, count: usize) -> usize {
    let mut accepted = 0;
    for n in 0..count {
        match pool.submit(task(n)) {
            Ok(_) => accepted += 1,
            Err(PoolError::PoolStalled { workers_lost, .. }) => {
                assert_eq!(workers_lost, 1);
                break;
            }
            Err(e) => panic!("unexpected submit error: {e}"),
        }
    }
    accepted
}

#[test]
fn dead_workers_with_queued_tasks_report_stall() {
    let pool = WorkerPool::new(PoolConfig::new(1));
    let results = pool.results();
    pool.start(explosive()).unwrap();
    let accepted = submit_until_stalled(&pool, 3);
    assert!(accepted >= 1);

    match pool.drain_and_stop() {
        Err(PoolError::PoolStalled {
            remaining,
            workers_lost,
        }) => {
            // The first task was popped by the worker that died on it.
            assert_eq!(remaining, accepted - 1);
            assert_eq!(workers_lost, 1);
        }
        other => panic!("expected PoolStalled, got {other:?}"),
    }
    assert_eq!(pool.state(), PoolState::Stopped);
    assert_eq!(pool.queued(), 0);
    assert_eq!(results.count(), 0);
}

#[test]
fn full_bounded_queue_with_dead_workers_fails_submit() {
    let pool = Arc::new(
        WorkerPool::spawn(PoolConfig::new(1).with_queue_capacity(2), explosive()).unwrap(),
    );
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);

    // Detached, so a producer stuck on the queue fails the test instead of hanging it.
    let producer = Arc::clone(&pool);
    thread::spawn(move || {
        let accepted = submit_until_stalled(&producer, 5);
        let stopped = producer.drain_and_stop();
        let _ = done_tx.send((accepted, stopped));
    });

    let (accepted, stopped) = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("producer never returned from submit");

    // One task popped by the dying worker plus at most two queued.
    assert!(accepted <= 3);
    assert!(matches!(
        stopped,
        Err(PoolError::PoolStalled {
            workers_lost: 1,
            ..
        })
    ));
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn stop_now_abandons_queued_tasks() {
    let (started_tx, started_rx) = crossbeam_channel::unbounded::<()>();
    let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();

    let gated: Arc<dyn Transform> = Arc::new(
        move |_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            Ok(())
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(1), gated).unwrap();
    for n in 0..10 {
        pool.submit(task(n)).unwrap();
    }
    started_rx.recv().unwrap();

    let summary = thread::scope(|s| {
        let stopper = s.spawn(|| pool.stop_now());
        while !pool.shutdown_signal().is_hard_stop() {
            thread::sleep(Duration::from_millis(1));
        }
        release_tx.send(()).unwrap();
        stopper.join().unwrap()
    })
    .unwrap();

    assert_eq!(summary.submitted, 10);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.abandoned, 9);
    assert_eq!(pool.results().count(), 1);
    assert_eq!(pool.shutdown_signal().state(), ShutdownState::Stopped);
}

#[test]
fn bounded_queue_applies_backpressure_without_losing_tasks() {
    let slow: Arc<dyn Transform> = Arc::new(
        |_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            thread::sleep(Duration::from_micros(200));
            Ok(())
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(2).with_queue_capacity(4), slow).unwrap();
    let results = pool.results();

    for n in 0..40 {
        pool.submit(task(n)).unwrap();
        assert!(pool.queued() <= 4);
    }
    let summary = pool.drain_and_stop().unwrap();

    assert_eq!(summary.processed, 40);
    assert_eq!(results.count(), 40);
}

#[test]
fn concurrent_producers_racing_a_drain() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 300;

    let jitter: Arc<dyn Transform> = Arc::new(
        |_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            let micros = rand::thread_rng().gen_range(0..50);
            thread::sleep(Duration::from_micros(micros));
            Ok(())
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(6), jitter).unwrap();
    let results = pool.results();
    let accepted = AtomicUsize::new(0);

    let summary = thread::scope(|s| {
        for p in 0..PRODUCERS {
            let pool = &pool;
            let accepted = &accepted;
            s.spawn(move || {
                for n in 0..PER_PRODUCER {
                    match pool.submit(task(p * PER_PRODUCER + n)) {
                        Ok(_) => {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(PoolError::PoolNotRunning) => break,
                        Err(e) => panic!("unexpected submit error: {e}"),
                    }
                }
            });
        }

        thread::sleep(Duration::from_millis(5));
        pool.drain_and_stop()
    })
    .unwrap();

    let collected: Vec<_> = results.collect();
    let accepted = accepted.load(Ordering::Relaxed);

    assert_eq!(collected.len(), accepted);
    assert_eq!(summary.submitted as usize, accepted);
    assert_eq!(summary.processed as usize, accepted);
    let unique: HashSet<_> = ids(&collected).into_iter().collect();
    assert_eq!(unique.len(), accepted);
}

#[test]
fn stress_many_tasks_all_delivered() {
    let jitter: Arc<dyn Transform> = Arc::new(
        |_: &Path, _: &Path, _: &ResizeParams| -> Result<(), TransformError> {
            if rand::thread_rng().gen_bool(0.1) {
                return Err(TransformError::Other("flaky".into()));
            }
            Ok(())
        },
    );
    let pool = WorkerPool::spawn(PoolConfig::new(8), jitter).unwrap();
    let results = pool.results();

    thread::scope(|s| {
        for p in 0..4 {
            let pool = &pool;
            s.spawn(move || {
                for n in 0..500 {
                    pool.submit(task(p * 500 + n)).unwrap();
                }
            });
        }
    });
    let summary = pool.drain_and_stop().unwrap();

    let collected: Vec<_> = results.collect();
    assert_eq!(collected.len(), 2000);
    assert_eq!(summary.succeeded + summary.failed, 2000);
    let unique: HashSet<_> = ids(&collected).into_iter().collect();
    assert_eq!(unique.len(), 2000);
}

#[test]
fn image_resizer_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in");
    let destination = dir.path().join("out");
    std::fs::create_dir_all(&source).unwrap();

    for n in 0..6 {
        image::DynamicImage::new_rgb8(120, 80)
            .save(source.join(format!("{n}.png")))
            .unwrap();
    }
    std::fs::write(source.join("broken.png"), b"not an image").unwrap();

    let resizer: Arc<dyn Transform> = Arc::new(ImageResizer::new(LimitsConfig::default()));
    let pool = WorkerPool::spawn(PoolConfig::new(3), resizer).unwrap();
    let results = pool.results();

    let mut entries: Vec<_> = std::fs::read_dir(&source)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    for path in &entries {
        let name = path.file_name().unwrap();
        pool.submit(Task::new(path, destination.join(name), ResizeParams::new(30, 20)))
            .unwrap();
    }
    let summary = pool.drain_and_stop().unwrap();

    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 1);

    let failed: Vec<_> = results.filter(|r| !r.outcome.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].task.file_name(), "broken.png");

    let resized = image::open(destination.join("0.png")).unwrap();
    assert_eq!((resized.width(), resized.height()), (30, 20));
}
