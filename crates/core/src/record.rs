//! Immutable metrics records
//!
//! A [`Record`] is a named group of tags and metric samples produced by one
//! source during one sampling pass. Records share their tag and metric
//! arrays behind `Arc`, so cloning a record for fan-out is cheap.

use std::fmt;
use std::sync::Arc;

use crate::filter::Filter;
use crate::info::MetricsInfo;
use crate::metric::AbstractMetric;
use crate::tag::Tag;

/// Named group of tags and metric samples from one sampling pass
#[derive(Clone)]
pub struct Record {
    info: MetricsInfo,
    timestamp: i64,
    tags: Arc<[Tag]>,
    metrics: Arc<[AbstractMetric]>,
}

impl Record {
    pub(crate) fn new(
        info: MetricsInfo,
        timestamp: i64,
        tags: Vec<Tag>,
        metrics: Vec<AbstractMetric>,
    ) -> Self {
        Self {
            info,
            timestamp,
            tags: tags.into(),
            metrics: metrics.into(),
        }
    }

    #[inline]
    pub fn info(&self) -> &MetricsInfo {
        &self.info
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.info.name()
    }

    #[inline]
    pub fn description(&self) -> &str {
        self.info.description()
    }

    /// Milliseconds since the epoch at which the record was staged
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[inline]
    pub fn metrics(&self) -> &[AbstractMetric] {
        &self.metrics
    }

    /// Value of the context tag, if one was applied
    pub fn context(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name() == "Context")
            .map(|t| t.value())
    }

    /// Copy of this record with `extra` tags appended
    pub fn with_tags(&self, extra: &[Tag]) -> Record {
        if extra.is_empty() {
            return self.clone();
        }
        let mut tags = self.tags.to_vec();
        tags.extend_from_slice(extra);
        Record {
            info: self.info.clone(),
            timestamp: self.timestamp,
            tags: tags.into(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Projection of this record through a metric filter
    ///
    /// Tags and timestamp are shared with the original; only metrics whose
    /// name the filter accepts are retained.
    pub fn filtered(&self, filter: &dyn Filter) -> Record {
        let metrics: Vec<AbstractMetric> = self
            .metrics
            .iter()
            .filter(|m| filter.accepts_name(m.name()))
            .cloned()
            .collect();
        Record {
            info: self.info.clone(),
            timestamp: self.timestamp,
            tags: Arc::clone(&self.tags),
            metrics: metrics.into(),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name())
            .field("timestamp", &self.timestamp)
            .field("tags", &self.tags)
            .field("metrics", &self.metrics)
            .finish()
    }
}
