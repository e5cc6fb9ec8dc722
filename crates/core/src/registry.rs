//! Metric registries
//!
//! A [`MetricsRegistry`] owns the mutable metrics of one source, keyed by
//! name in insertion order, plus an optional context tag. Like the metrics
//! themselves, a registry is a cheap cloneable handle: the source object and
//! the synthesized source share one underlying map.

use std::collections::HashMap;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::collector::RecordBuilder;
use crate::error::{MetricsError, Result};
use crate::info::MetricsInfo;
use crate::metric::MetricValue;
use crate::mutable::{
    MutableCounterInt, MutableCounterLong, MutableFnGauge, MutableGaugeDouble, MutableGaugeFloat,
    MutableGaugeInt, MutableGaugeLong, MutableMetric, MutableStat,
};

/// Ordered name → mutable-metric container for one source
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    info: MetricsInfo,
    state: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    metrics: Vec<MutableMetric>,
    index: HashMap<String, usize>,
    context: Option<String>,
}

impl MetricsRegistry {
    /// Create a registry named `name`
    pub fn new(name: &str) -> Self {
        Self::with_info(crate::info::info(name, name))
    }

    /// Create a registry identified by `info`
    pub fn with_info(info: MetricsInfo) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                info,
                state: Mutex::new(RegistryState::default()),
            }),
        }
    }

    #[inline]
    pub fn info(&self) -> MetricsInfo {
        self.inner.info.clone()
    }

    /// Set the context tag appended to every record this registry emits
    pub fn set_context(&self, value: &str) {
        self.inner.state.lock().context = Some(value.to_string());
    }

    pub fn context(&self) -> Option<String> {
        self.inner.state.lock().context.clone()
    }

    /// Register `metric` under `name`
    pub fn add(&self, name: &str, metric: impl Into<MutableMetric>) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.index.contains_key(name) {
            return Err(MetricsError::DuplicateName(name.to_string()));
        }
        state.metrics.push(metric.into());
        let position = state.metrics.len() - 1;
        state.index.insert(name.to_string(), position);
        Ok(())
    }

    /// Metric registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<MutableMetric> {
        let state = self.inner.state.lock();
        state.index.get(name).map(|&i| state.metrics[i].clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.state.lock().metrics.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn new_counter_int(&self, info: MetricsInfo, initial: i32) -> Result<MutableCounterInt> {
        let metric = MutableCounterInt::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    pub fn new_counter(&self, info: MetricsInfo, initial: i64) -> Result<MutableCounterLong> {
        let metric = MutableCounterLong::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    pub fn new_gauge_int(&self, info: MetricsInfo, initial: i32) -> Result<MutableGaugeInt> {
        let metric = MutableGaugeInt::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    pub fn new_gauge(&self, info: MetricsInfo, initial: i64) -> Result<MutableGaugeLong> {
        let metric = MutableGaugeLong::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    pub fn new_gauge_float(&self, info: MetricsInfo, initial: f32) -> Result<MutableGaugeFloat> {
        let metric = MutableGaugeFloat::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    pub fn new_gauge_double(&self, info: MetricsInfo, initial: f64) -> Result<MutableGaugeDouble> {
        let metric = MutableGaugeDouble::new(info.clone(), initial);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    /// Create and register a rolling stat
    pub fn new_stat(
        &self,
        name: &str,
        description: &str,
        sample_name: &str,
        value_name: &str,
        extended: bool,
    ) -> Result<MutableStat> {
        let metric = MutableStat::new(name, description, sample_name, value_name, extended);
        self.add(name, metric.clone())?;
        Ok(metric)
    }

    /// Register a gauge sampled from a closure at snapshot time
    pub fn fn_gauge(
        &self,
        info: MetricsInfo,
        sample: impl Fn() -> MetricValue + Send + Sync + 'static,
    ) -> Result<MutableFnGauge> {
        let metric = MutableFnGauge::new(info.clone(), sample);
        self.add(info.name(), metric.clone())?;
        Ok(metric)
    }

    /// Snapshot every metric into `rb`, in registration order
    ///
    /// The metric handles are collected under the lock and snapshotted
    /// outside it, so a metric registered from inside a source callback
    /// becomes visible on the next pass rather than mid-iteration.
    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        let (context, metrics) = {
            let state = self.inner.state.lock();
            (state.context.clone(), state.metrics.clone())
        };
        if let Some(context) = context {
            rb.set_context(&context);
        }
        for metric in &metrics {
            metric.snapshot(rb, all);
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
