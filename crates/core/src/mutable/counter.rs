//! Mutable counters
//!
//! Monotonic accumulators; `incr` is the only mutation. Values wrap on
//! overflow (two's-complement `fetch_add`).

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

use crate::collector::RecordBuilder;
use crate::info::MetricsInfo;

/// Monotonic 32-bit counter handle
#[derive(Debug, Clone)]
pub struct MutableCounterInt {
    inner: Arc<CounterIntCell>,
}

#[derive(Debug)]
struct CounterIntCell {
    info: MetricsInfo,
    value: AtomicI32,
    changed: AtomicBool,
}

impl MutableCounterInt {
    pub fn new(info: MetricsInfo, initial: i32) -> Self {
        Self {
            inner: Arc::new(CounterIntCell {
                info,
                value: AtomicI32::new(initial),
                changed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    #[inline]
    pub fn incr(&self) {
        self.incr_by(1);
    }

    #[inline]
    pub fn incr_by(&self, delta: i32) {
        debug_assert!(delta >= 0, "counters are monotonic");
        self.inner.value.fetch_add(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.inner.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_counter_int(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

/// Monotonic 64-bit counter handle
#[derive(Debug, Clone)]
pub struct MutableCounterLong {
    inner: Arc<CounterLongCell>,
}

#[derive(Debug)]
struct CounterLongCell {
    info: MetricsInfo,
    value: AtomicI64,
    changed: AtomicBool,
}

impl MutableCounterLong {
    pub fn new(info: MetricsInfo, initial: i64) -> Self {
        Self {
            inner: Arc::new(CounterLongCell {
                info,
                value: AtomicI64::new(initial),
                changed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    #[inline]
    pub fn incr(&self) {
        self.incr_by(1);
    }

    #[inline]
    pub fn incr_by(&self, delta: i64) {
        debug_assert!(delta >= 0, "counters are monotonic");
        self.inner.value.fetch_add(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.inner.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_counter(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[path = "counter_test.rs"]
mod counter_test;
