//! Per-sink configuration
//!
//! Controls the delivery cadence and backpressure behavior of one sink
//! adapter: its publishing period, queue bound, and retry schedule.
//!
//! # Defaults
//!
//! - `period`: 10s
//! - `queue_capacity`: 1
//! - `retry_delay`: 10s
//! - `retry_backoff`: 2.0
//! - `retry_count`: 1

use std::time::Duration;

use serde::Deserialize;

use crate::FilterSpec;

/// Configuration for one sink adapter
///
/// # Example
///
/// ```toml
/// [sink.file]
/// period = "10s"
/// queue_capacity = 2
/// retry_delay = "10s"
/// retry_backoff = 2.0
/// retry_count = 3
/// context = "all"
///
/// [sink.file.record_filter]
/// exclude = ["Ugi*"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Publishing period for this sink; must be a multiple of the base tick
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub period: Duration,

    /// Bounded queue capacity; the oldest buffer is discarded on overflow
    /// Default: 1
    pub queue_capacity: usize,

    /// Delay before the first redelivery attempt
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Multiplier applied to the delay after each consecutive failure
    /// Default: 2.0
    pub retry_backoff: f64,

    /// Consecutive failures tolerated before the buffer is dropped
    /// Default: 1
    pub retry_count: u32,

    /// Context this sink is interested in (routing key for plugins)
    pub context: Option<String>,

    /// Only deliver entries from sources matching this filter
    pub source_filter: FilterSpec,

    /// Only deliver records matching this filter
    pub record_filter: FilterSpec,

    /// Only deliver metrics matching this filter
    pub metric_filter: FilterSpec,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            queue_capacity: 1,
            retry_delay: Duration::from_secs(10),
            retry_backoff: 2.0,
            retry_count: 1,
            context: None,
            source_filter: FilterSpec::default(),
            record_filter: FilterSpec::default(),
            metric_filter: FilterSpec::default(),
        }
    }
}
