//! Source adapters
//!
//! A [`SourceAdapter`] wraps one registered source for the sampling loop:
//! it installs the source's configured filters on the collector, invokes the
//! user callback defensively, applies the orchestrator-injected tags to the
//! resulting records, and serves cached snapshots to the introspection bean
//! it registers while started.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use tally_config::SourceConfig;
use tally_core::{Collector, Filter, GlobFilter, MetricValue, Record, Source, Tag};

use crate::beans::{self, AttributeValue, MetricsView};

/// Wraps one source with its filters, injected tags and snapshot cache
pub struct SourceAdapter {
    name: String,
    description: String,
    source: Arc<dyn Source>,
    injected_tags: Vec<Tag>,
    record_filter: Option<Arc<dyn Filter>>,
    metric_filter: Option<Arc<dyn Filter>>,
    cache_ttl: Duration,
    cache: Mutex<SnapshotCache>,
    bean_name: Mutex<Option<String>>,
}

#[derive(Default)]
struct SnapshotCache {
    records: Vec<Record>,
    taken_at: Option<Instant>,
}

impl SourceAdapter {
    /// Wrap `source`; `period` doubles as the introspection cache TTL
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        source: Arc<dyn Source>,
        injected_tags: Vec<Tag>,
        period: Duration,
        config: &SourceConfig,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            source,
            injected_tags,
            record_filter: GlobFilter::from_spec(&config.record_filter)
                .map(|f| Arc::new(f) as Arc<dyn Filter>),
            metric_filter: GlobFilter::from_spec(&config.metric_filter)
                .map(|f| Arc::new(f) as Arc<dyn Filter>),
            cache_ttl: period,
            cache: Mutex::new(SnapshotCache::default()),
            bean_name: Mutex::new(None),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn source(&self) -> Arc<dyn Source> {
        Arc::clone(&self.source)
    }

    /// Sample this source into `collector` and return the finalized records
    ///
    /// A fault in the user callback yields zero records for this pass and a
    /// WARN; it never reaches the sampling loop.
    pub fn get_metrics(&self, collector: &mut Collector, all: bool) -> Vec<Record> {
        collector.clear();
        collector.set_record_filter(self.record_filter.clone());
        collector.set_metric_filter(self.metric_filter.clone());

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.source.get_metrics(collector, all);
        }));
        if outcome.is_err() {
            tracing::warn!(source = %self.name, "source faulted during snapshot, yielding no records this pass");
            collector.clear();
            return Vec::new();
        }

        let records = collector.get_records();
        collector.clear();
        if self.injected_tags.is_empty() {
            records
        } else {
            records
                .into_iter()
                .map(|r| r.with_tags(&self.injected_tags))
                .collect()
        }
    }

    /// Publish this adapter's introspection bean
    pub fn start(self: &Arc<Self>, prefix: &str) {
        let bean = format!("{}:name={}", prefix, self.name);
        beans::register(bean.clone(), Arc::clone(self) as Arc<dyn MetricsView>);
        *self.bean_name.lock() = Some(bean);
        tracing::debug!(source = %self.name, "source adapter started");
    }

    /// Retract the introspection bean
    pub fn stop(&self) {
        if let Some(bean) = self.bean_name.lock().take() {
            beans::unregister(&bean);
        }
        tracing::debug!(source = %self.name, "source adapter stopped");
    }

    /// Current records, re-sampled at most once per cache interval
    ///
    /// Backs attribute reads: external pollers hitting the bean faster than
    /// the TTL get the cached snapshot.
    pub fn snapshot_cached(&self) -> Vec<Record> {
        let mut cache = self.cache.lock();
        let stale = cache
            .taken_at
            .map_or(true, |taken| taken.elapsed() >= self.cache_ttl);
        if stale {
            let mut collector = Collector::new();
            cache.records = self.get_metrics(&mut collector, true);
            cache.taken_at = Some(Instant::now());
        }
        cache.records.clone()
    }
}

impl MetricsView for SourceAdapter {
    fn attributes(&self) -> Vec<(String, AttributeValue)> {
        let mut attributes = Vec::new();
        for record in self.snapshot_cached() {
            for tag in record.tags() {
                attributes.push((
                    format!("tag.{}", tag.name()),
                    AttributeValue::Text(tag.value().to_string()),
                ));
            }
            for metric in record.metrics() {
                let value = match metric.value() {
                    MetricValue::CounterInt(v) | MetricValue::GaugeInt(v) => {
                        AttributeValue::Int(v as i64)
                    }
                    MetricValue::CounterLong(v) | MetricValue::GaugeLong(v) => {
                        AttributeValue::Int(v)
                    }
                    MetricValue::GaugeFloat(v) => AttributeValue::Float(v as f64),
                    MetricValue::GaugeDouble(v) => AttributeValue::Float(v),
                };
                attributes.push((metric.name().to_string(), value));
            }
        }
        attributes
    }
}

#[cfg(test)]
#[path = "source_adapter_test.rs"]
mod source_adapter_test;
