//! Tally - Configuration
//!
//! Pre-parsed, hierarchical configuration for the metrics system: the base
//! sampling period, system-wide filters, and per-sink / per-source sections.
//! The orchestrator consumes these types as plain data; filter patterns are
//! compiled into predicates by the core crate.
//!
//! # Overview
//!
//! ```toml
//! period = "10s"
//!
//! [source_filter]
//! include = ["Rpc*"]
//!
//! [sink.file]
//! period = "10s"
//! queue_capacity = 1
//! retry_delay = "10s"
//! retry_backoff = 2.0
//! retry_count = 1
//!
//! [source.jvm.metric_filter]
//! include = ["Threads*"]
//! ```
//!
//! All fields are optional; an empty document yields working defaults.

mod error;
mod filter;
mod sinks;
mod sources;

pub use error::{ConfigError, Result};
pub use filter::FilterSpec;
pub use sinks::SinkConfig;
pub use sources::SourceConfig;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration for one metrics system instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Base sampling period
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub period: Duration,

    /// System-wide source filter applied during sampling
    pub source_filter: FilterSpec,

    /// Default record filter for sources without their own section
    pub record_filter: FilterSpec,

    /// Default metric filter for sources without their own section
    pub metric_filter: FilterSpec,

    /// Per-sink sections, keyed by sink name
    #[serde(rename = "sink")]
    pub sinks: BTreeMap<String, SinkConfig>,

    /// Per-source sections, keyed by source name
    #[serde(rename = "source")]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            source_filter: FilterSpec::default(),
            record_filter: FilterSpec::default(),
            metric_filter: FilterSpec::default(),
            sinks: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }
}

impl MetricsConfig {
    /// Parse a configuration from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value-level constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(ConfigError::invalid_value(
                "system",
                "metrics",
                "period",
                "must be non-zero",
            ));
        }
        for (name, sink) in &self.sinks {
            if sink.period.is_zero() {
                return Err(ConfigError::invalid_value(
                    "sink",
                    name.clone(),
                    "period",
                    "must be non-zero",
                ));
            }
            if sink.retry_backoff < 1.0 {
                return Err(ConfigError::invalid_value(
                    "sink",
                    name.clone(),
                    "retry_backoff",
                    format!("must be >= 1.0, got {}", sink.retry_backoff),
                ));
            }
        }
        Ok(())
    }

    /// Sink section for `name`, or the defaults when none is configured
    pub fn sink(&self, name: &str) -> SinkConfig {
        self.sinks.get(name).cloned().unwrap_or_default()
    }

    /// Source section for `name`, or the defaults when none is configured
    pub fn source(&self, name: &str) -> SourceConfig {
        self.sources.get(name).cloned().unwrap_or_default()
    }
}
