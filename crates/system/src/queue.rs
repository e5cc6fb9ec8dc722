//! Bounded sink queues
//!
//! The backpressure primitive between the sampling timer and each sink
//! worker. The queue is a bounded FIFO with drop-head overflow: a full
//! queue discards its oldest item to admit the newest, so a slow sink
//! always wakes up to the freshest snapshots and the producer never waits.
//!
//! `offer` is the timer-side non-blocking path; `offer_wait` backs the
//! on-demand publish with a bounded wait for space; `dequeue` is the worker
//! side and parks until an item or close arrives.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Bounded FIFO with drop-head overflow
#[derive(Debug)]
pub(crate) struct SinkQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: usize,
    items: Notify,
    space: Notify,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> SinkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            items: Notify::new(),
            space: Notify::new(),
        }
    }

    /// Non-blocking offer; discards the oldest item when full
    ///
    /// Returns false when something was lost: the head was dropped to make
    /// room, or the queue is closed.
    pub fn offer(&self, item: T) -> bool {
        let dropped_head = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            let dropped = if state.items.len() >= self.capacity {
                state.items.pop_front();
                true
            } else {
                false
            };
            state.items.push_back(item);
            dropped
        };
        self.items.notify_one();
        !dropped_head
    }

    /// Offer with a bounded wait for space; never discards
    ///
    /// Returns false when the wait expires or the queue is closed.
    pub async fn offer_wait(&self, item: T, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        let mut item = Some(item);
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return false;
                }
                if state.items.len() < self.capacity {
                    if let Some(item) = item.take() {
                        state.items.push_back(item);
                    }
                    drop(state);
                    self.items.notify_one();
                    return true;
                }
            }
            let space = self.space.notified();
            if tokio::time::timeout_at(deadline, space).await.is_err() {
                return false;
            }
        }
    }

    /// Take the oldest item, waiting for one to arrive
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.space.notify_one();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            self.items.notified().await;
        }
    }

    /// Take the oldest item if one is immediately available
    pub fn try_dequeue(&self) -> Option<T> {
        let item = self.state.lock().items.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Close the queue; pending items remain dequeueable
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.items.notify_waiters();
        self.space.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
