//! Snapshot staging
//!
//! A [`Collector`] is the transient staging area for one sampling pass: a
//! source asks it for a [`RecordBuilder`] per record, fills the builder with
//! tags and metric samples, and the sampler finalizes everything into
//! immutable [`Record`]s. Record and metric filters are applied at build
//! time, so rejected data is never materialized.
//!
//! Collectors are not thread-safe; the sampler owns one and clears it
//! between sources so each source's records stay isolated.

use std::sync::Arc;

use chrono::Utc;

use crate::filter::Filter;
use crate::info::{context_info, info, MetricsInfo};
use crate::metric::{AbstractMetric, MetricValue};
use crate::record::Record;
use crate::tag::{tag, Tag};

/// Staging area for the records of one sampling pass
#[derive(Debug, Default)]
pub struct Collector {
    builders: Vec<RecordBuilder>,
    record_filter: Option<Arc<dyn Filter>>,
    metric_filter: Option<Arc<dyn Filter>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the record filter applied to subsequent `add_record` calls
    pub fn set_record_filter(&mut self, filter: Option<Arc<dyn Filter>>) {
        self.record_filter = filter;
    }

    /// Install the metric filter applied inside subsequent builders
    pub fn set_metric_filter(&mut self, filter: Option<Arc<dyn Filter>>) {
        self.metric_filter = filter;
    }

    /// Start a record for `info`
    ///
    /// When the record filter rejects the name, the returned builder accepts
    /// calls but retains nothing, so source code never needs to branch.
    pub fn add_record(&mut self, info: MetricsInfo) -> &mut RecordBuilder {
        let acceptable = self
            .record_filter
            .as_ref()
            .map_or(true, |f| f.accepts_name(info.name()));
        self.builders.push(RecordBuilder::new(
            info,
            self.metric_filter.clone(),
            acceptable,
        ));
        let last = self.builders.len() - 1;
        &mut self.builders[last]
    }

    /// Start a record named `name`, synthesizing its description
    pub fn add_record_named(&mut self, name: &str) -> &mut RecordBuilder {
        self.add_record(info(name, &format!("{name} record")))
    }

    /// Finalize the pass: one record per accepted builder
    pub fn get_records(&self) -> Vec<Record> {
        self.builders
            .iter()
            .filter_map(|rb| rb.build(self.record_filter.as_deref()))
            .collect()
    }

    /// Discard all staged builders
    pub fn clear(&mut self) {
        self.builders.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

/// Accumulates the tags and metric samples of one record
///
/// Returned by [`Collector::add_record`]; never outlives the pass.
#[derive(Debug)]
pub struct RecordBuilder {
    info: MetricsInfo,
    timestamp: i64,
    tags: Vec<Tag>,
    metrics: Vec<AbstractMetric>,
    metric_filter: Option<Arc<dyn Filter>>,
    acceptable: bool,
}

impl RecordBuilder {
    fn new(info: MetricsInfo, metric_filter: Option<Arc<dyn Filter>>, acceptable: bool) -> Self {
        Self {
            info,
            timestamp: Utc::now().timestamp_millis(),
            tags: Vec::new(),
            metrics: Vec::new(),
            metric_filter,
            acceptable,
        }
    }

    /// Append an interned tag
    pub fn tag(&mut self, info: MetricsInfo, value: &str) -> &mut Self {
        if self.acceptable {
            self.tags.push(tag(info, value));
        }
        self
    }

    /// Append an already-built tag, bypassing filtering
    pub fn add_tag(&mut self, tag: Tag) -> &mut Self {
        self.tags.push(tag);
        self
    }

    /// Append an already-built sample, bypassing filtering
    pub fn add_metric(&mut self, metric: AbstractMetric) -> &mut Self {
        self.metrics.push(metric);
        self
    }

    pub fn add_counter_int(&mut self, info: MetricsInfo, value: i32) -> &mut Self {
        self.push_value(info, MetricValue::CounterInt(value))
    }

    pub fn add_counter(&mut self, info: MetricsInfo, value: i64) -> &mut Self {
        self.push_value(info, MetricValue::CounterLong(value))
    }

    pub fn add_gauge_int(&mut self, info: MetricsInfo, value: i32) -> &mut Self {
        self.push_value(info, MetricValue::GaugeInt(value))
    }

    pub fn add_gauge(&mut self, info: MetricsInfo, value: i64) -> &mut Self {
        self.push_value(info, MetricValue::GaugeLong(value))
    }

    pub fn add_gauge_float(&mut self, info: MetricsInfo, value: f32) -> &mut Self {
        self.push_value(info, MetricValue::GaugeFloat(value))
    }

    pub fn add_gauge_double(&mut self, info: MetricsInfo, value: f64) -> &mut Self {
        self.push_value(info, MetricValue::GaugeDouble(value))
    }

    /// Append the context tag
    pub fn set_context(&mut self, value: &str) -> &mut Self {
        self.tag(context_info(), value)
    }

    fn push_value(&mut self, info: MetricsInfo, value: MetricValue) -> &mut Self {
        if self.acceptable
            && self
                .metric_filter
                .as_ref()
                .map_or(true, |f| f.accepts_name(info.name()))
        {
            self.metrics.push(AbstractMetric::new(info, value));
        }
        self
    }

    /// Finalize into a record, unless rejected at record or tag level
    fn build(&self, record_filter: Option<&dyn Filter>) -> Option<Record> {
        if self.acceptable && record_filter.map_or(true, |f| f.accepts_tags(&self.tags)) {
            Some(Record::new(
                self.info.clone(),
                self.timestamp,
                self.tags.clone(),
                self.metrics.clone(),
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod collector_test;
