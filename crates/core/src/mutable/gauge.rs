//! Mutable gauges
//!
//! Point-in-time values supporting `set` and relative updates. Integer
//! gauges are plain atomics; floating-point gauges store the bit pattern and
//! update relative values with a compare-exchange loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::collector::RecordBuilder;
use crate::info::MetricsInfo;
use crate::metric::MetricValue;

/// 32-bit integer gauge handle
#[derive(Debug, Clone)]
pub struct MutableGaugeInt {
    inner: Arc<GaugeIntCell>,
}

#[derive(Debug)]
struct GaugeIntCell {
    info: MetricsInfo,
    value: AtomicI32,
    changed: AtomicBool,
}

impl MutableGaugeInt {
    pub fn new(info: MetricsInfo, initial: i32) -> Self {
        Self {
            inner: Arc::new(GaugeIntCell {
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
    pub fn set(&self, value: i32) {
        self.inner.value.store(value, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr(&self) {
        self.incr_by(1);
    }

    #[inline]
    pub fn decr(&self) {
        self.decr_by(1);
    }

    #[inline]
    pub fn incr_by(&self, delta: i32) {
        self.inner.value.fetch_add(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn decr_by(&self, delta: i32) {
        self.inner.value.fetch_sub(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.inner.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_gauge_int(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

/// 64-bit integer gauge handle
#[derive(Debug, Clone)]
pub struct MutableGaugeLong {
    inner: Arc<GaugeLongCell>,
}

#[derive(Debug)]
struct GaugeLongCell {
    info: MetricsInfo,
    value: AtomicI64,
    changed: AtomicBool,
}

impl MutableGaugeLong {
    pub fn new(info: MetricsInfo, initial: i64) -> Self {
        Self {
            inner: Arc::new(GaugeLongCell {
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
    pub fn set(&self, value: i64) {
        self.inner.value.store(value, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr(&self) {
        self.incr_by(1);
    }

    #[inline]
    pub fn decr(&self) {
        self.decr_by(1);
    }

    #[inline]
    pub fn incr_by(&self, delta: i64) {
        self.inner.value.fetch_add(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn decr_by(&self, delta: i64) {
        self.inner.value.fetch_sub(delta, Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.inner.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_gauge(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

/// 32-bit floating-point gauge handle
#[derive(Debug, Clone)]
pub struct MutableGaugeFloat {
    inner: Arc<GaugeFloatCell>,
}

#[derive(Debug)]
struct GaugeFloatCell {
    info: MetricsInfo,
    bits: AtomicU32,
    changed: AtomicBool,
}

impl MutableGaugeFloat {
    pub fn new(info: MetricsInfo, initial: f32) -> Self {
        Self {
            inner: Arc::new(GaugeFloatCell {
                info,
                bits: AtomicU32::new(initial.to_bits()),
                changed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.inner.bits.store(value.to_bits(), Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    pub fn incr_by(&self, delta: f32) {
        let mut current = self.inner.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + delta).to_bits();
            match self.inner.bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> f32 {
        f32::from_bits(self.inner.bits.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_gauge_float(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

/// 64-bit floating-point gauge handle
#[derive(Debug, Clone)]
pub struct MutableGaugeDouble {
    inner: Arc<GaugeDoubleCell>,
}

#[derive(Debug)]
struct GaugeDoubleCell {
    info: MetricsInfo,
    bits: AtomicU64,
    changed: AtomicBool,
}

impl MutableGaugeDouble {
    pub fn new(info: MetricsInfo, initial: f64) -> Self {
        Self {
            inner: Arc::new(GaugeDoubleCell {
                info,
                bits: AtomicU64::new(initial.to_bits()),
                changed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.inner.bits.store(value.to_bits(), Ordering::Relaxed);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    pub fn incr_by(&self, delta: f64) {
        let mut current = self.inner.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self.inner.bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        f64::from_bits(self.inner.bits.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            rb.add_gauge_double(self.inner.info.clone(), self.value());
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

/// Gauge whose value is produced by a closure at snapshot time
///
/// The closure runs on the sampling thread and must not block. Because the
/// value lives outside the metrics system there is no changed flag; the
/// gauge emits on every pass.
#[derive(Clone)]
pub struct MutableFnGauge {
    inner: Arc<FnGaugeCell>,
}

struct FnGaugeCell {
    info: MetricsInfo,
    sample: Box<dyn Fn() -> MetricValue + Send + Sync>,
}

impl MutableFnGauge {
    pub fn new(
        info: MetricsInfo,
        sample: impl Fn() -> MetricValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(FnGaugeCell {
                info,
                sample: Box::new(sample),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    #[inline]
    pub fn value(&self) -> MetricValue {
        (self.inner.sample)()
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, _all: bool) {
        let info = self.inner.info.clone();
        match self.value() {
            MetricValue::CounterInt(v) => rb.add_counter_int(info, v),
            MetricValue::CounterLong(v) => rb.add_counter(info, v),
            MetricValue::GaugeInt(v) => rb.add_gauge_int(info, v),
            MetricValue::GaugeLong(v) => rb.add_gauge(info, v),
            MetricValue::GaugeFloat(v) => rb.add_gauge_float(info, v),
            MetricValue::GaugeDouble(v) => rb.add_gauge_double(info, v),
        };
    }
}

impl fmt::Debug for MutableFnGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableFnGauge")
            .field("info", &self.inner.info)
            .finish()
    }
}

#[cfg(test)]
#[path = "gauge_test.rs"]
mod gauge_test;
