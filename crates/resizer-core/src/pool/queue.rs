//! Blocking FIFO task queue shared by the producer and the workers.
//!
//! The queue is a `VecDeque` behind a `parking_lot` mutex with two condition
//! variables: `not_empty` wakes consumers, `not_full` wakes producers blocked on
//! a bounded queue. Closing never drops queued items; consumers keep receiving
//! them until the queue is empty and only then see [`Pop::Closed`].
//!
//! A queue is marked stalled once no consumer is left alive; producers blocked
//! on a full queue are woken and fail instead of waiting forever.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use crate::error::PoolError;

/// Outcome of a blocking [`TaskQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    /// The next item, owned exclusively by the caller
    Item(T),
    /// The queue is closed and fully drained
    Closed,
}

/// Error returned by [`TaskQueue::try_push`], handing the item back.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPushError<T> {
    /// Bounded queue is at capacity
    Full(T),
    /// Queue has been closed
    Closed(T),
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
    stalled: bool,
    pushed: u64,
}

/// Multi-producer, multi-consumer blocking queue.
pub struct TaskQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> TaskQueue<T> {
    /// Create a queue with no capacity limit.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Create a queue holding at most `capacity` items.
    ///
    /// A capacity of zero is treated as one so that `push` can make progress.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
                stalled: false,
                pushed: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Append an item, blocking while a bounded queue is full.
    ///
    /// Fails with [`PoolError::QueueClosed`] if the queue is closed before or
    /// while waiting for space, and with [`PoolError::PoolStalled`] once no
    /// consumer is left to make space. The stall error leaves `workers_lost`
    /// at zero; the queue does not track workers.
    pub fn push(&self, item: T) -> Result<(), PoolError> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(PoolError::QueueClosed);
            }
            if inner.stalled {
                return Err(PoolError::PoolStalled {
                    remaining: inner.items.len(),
                    workers_lost: 0,
                });
            }
            if !self.is_full(&inner) {
                break;
            }
            self.not_full.wait(&mut inner);
        }
        inner.items.push_back(item);
        inner.pushed += 1;
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append an item without blocking. A stalled queue reports `Closed`.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        let mut inner = self.inner.lock();
        if inner.closed || inner.stalled {
            return Err(TryPushError::Closed(item));
        }
        if self.is_full(&inner) {
            return Err(TryPushError::Full(item));
        }
        inner.items.push_back(item);
        inner.pushed += 1;
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the next item, blocking while the queue is empty and open.
    pub fn pop(&self) -> Pop<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Pop::Item(item);
            }
            if inner.closed {
                return Pop::Closed;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Stop accepting items and wake every blocked producer and consumer.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was already
    /// closed.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        let newly_closed = !inner.closed;
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        newly_closed
    }

    /// Close the queue and take every queued item in one step.
    ///
    /// No consumer can pop between the close and the discard.
    pub fn close_and_discard(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let drained: Vec<T> = inner.items.drain(..).collect();
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        drained
    }

    /// Record that no consumer is alive and fail every blocked producer.
    pub fn mark_stalled(&self) {
        self.inner.lock().stalled = true;
        self.not_full.notify_all();
    }

    pub fn is_stalled(&self) -> bool {
        self.inner.lock().stalled
    }

    /// Remove and return every queued item.
    pub fn discard_pending(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        let drained: Vec<T> = inner.items.drain(..).collect();
        drop(inner);
        self.not_full.notify_all();
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Items accepted since creation.
    pub fn total_pushed(&self) -> u64 {
        self.inner.lock().pushed
    }

    /// Capacity limit, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn is_full(&self, inner: &Inner<T>) -> bool {
        self.capacity
            .is_some_and(|capacity| inner.items.len() >= capacity)
    }
}
