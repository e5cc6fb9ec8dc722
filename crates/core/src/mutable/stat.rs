//! Mutable statistical summaries
//!
//! A stat accumulates samples into `(count, sum, min, max, sum of squares)`
//! under a short lock and emits derived sub-metrics at snapshot time:
//! `<name>Num` (cumulative sample count, counter), `<name>Avg`, `<name>Min`
//! and `<name>Max` (gauges over the current window), plus `<name>Stdev` when
//! constructed extended.
//!
//! A rolling stat clears its window after every emitted snapshot, so each
//! pass reports the interval since the previous one; a non-rolling stat
//! accumulates over its whole lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collector::RecordBuilder;
use crate::info::{info, MetricsInfo};

#[derive(Debug, Default, Clone, Copy)]
struct Window {
    count: u64,
    total: f64,
    min: f64,
    max: f64,
    ssq: f64,
}

impl Window {
    fn add(&mut self, sample: f64) {
        if self.count == 0 {
            self.min = sample;
            self.max = sample;
        } else {
            self.min = self.min.min(sample);
            self.max = self.max.max(sample);
        }
        self.count += 1;
        self.total += sample;
        self.ssq += sample * sample;
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }

    fn stdev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.ssq - self.total * self.total / n) / (n - 1.0);
        variance.max(0.0).sqrt()
    }
}

#[derive(Debug, Default)]
struct StatState {
    window: Window,
    total_count: u64,
}

/// Rolling or cumulative sample summary handle
#[derive(Debug, Clone)]
pub struct MutableStat {
    inner: Arc<StatCell>,
}

#[derive(Debug)]
struct StatCell {
    info: MetricsInfo,
    num_info: MetricsInfo,
    avg_info: MetricsInfo,
    min_info: MetricsInfo,
    max_info: MetricsInfo,
    stdev_info: MetricsInfo,
    extended: bool,
    rolling: bool,
    state: Mutex<StatState>,
    changed: AtomicBool,
}

impl MutableStat {
    /// Create a rolling stat
    ///
    /// `sample_name` and `value_name` describe what is being counted and
    /// measured (e.g. "Ops" and "Time") and appear in the sub-metric
    /// descriptions.
    pub fn new(
        name: &str,
        description: &str,
        sample_name: &str,
        value_name: &str,
        extended: bool,
    ) -> Self {
        Self::with_rolling(name, description, sample_name, value_name, extended, true)
    }

    /// Create a stat with an explicit window policy
    pub fn with_rolling(
        name: &str,
        description: &str,
        sample_name: &str,
        value_name: &str,
        extended: bool,
        rolling: bool,
    ) -> Self {
        Self {
            inner: Arc::new(StatCell {
                info: info(name, description),
                num_info: info(
                    &format!("{name}Num"),
                    &format!("Number of {sample_name} for {description}"),
                ),
                avg_info: info(
                    &format!("{name}Avg"),
                    &format!("Average {value_name} for {description}"),
                ),
                min_info: info(
                    &format!("{name}Min"),
                    &format!("Min {value_name} for {description}"),
                ),
                max_info: info(
                    &format!("{name}Max"),
                    &format!("Max {value_name} for {description}"),
                ),
                stdev_info: info(
                    &format!("{name}Stdev"),
                    &format!("Standard deviation of {value_name} for {description}"),
                ),
                extended,
                rolling,
                state: Mutex::new(StatState::default()),
                changed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    /// Record one sample
    pub fn add(&self, sample: f64) {
        let mut state = self.inner.state.lock();
        state.window.add(sample);
        state.total_count += 1;
        drop(state);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    /// Record a pre-aggregated batch of samples (count and sum only)
    pub fn add_all(&self, count: u64, total: f64) {
        let mut state = self.inner.state.lock();
        state.window.count += count;
        state.window.total += total;
        state.total_count += count;
        drop(state);
        self.inner.changed.store(true, Ordering::Relaxed);
    }

    /// Cumulative number of samples ever recorded
    pub fn sample_count(&self) -> u64 {
        self.inner.state.lock().total_count
    }

    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        if all || self.inner.changed.load(Ordering::Relaxed) {
            let mut state = self.inner.state.lock();
            rb.add_counter(self.inner.num_info.clone(), state.total_count as i64);
            rb.add_gauge_double(self.inner.avg_info.clone(), state.window.avg());
            rb.add_gauge_double(self.inner.min_info.clone(), state.window.min());
            rb.add_gauge_double(self.inner.max_info.clone(), state.window.max());
            if self.inner.extended {
                rb.add_gauge_double(self.inner.stdev_info.clone(), state.window.stdev());
            }
            if self.inner.rolling {
                state.window = Window::default();
            }
            drop(state);
            self.inner.changed.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[path = "stat_test.rs"]
mod stat_test;
