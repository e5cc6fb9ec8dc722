//! Immutable metric samples
//!
//! An [`AbstractMetric`] is a point-in-time sample read from a mutable
//! metric: metadata plus a typed value. Once materialized into a record it
//! never changes; the mutable metric that produced it lives on in its
//! registry.

use std::fmt;

use crate::info::MetricsInfo;

/// Whether a sample is a monotonic counter or a point-in-time gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Typed sample value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    CounterInt(i32),
    CounterLong(i64),
    GaugeInt(i32),
    GaugeLong(i64),
    GaugeFloat(f32),
    GaugeDouble(f64),
}

impl MetricValue {
    /// Counter or gauge
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::CounterInt(_) | Self::CounterLong(_) => MetricKind::Counter,
            Self::GaugeInt(_)
            | Self::GaugeLong(_)
            | Self::GaugeFloat(_)
            | Self::GaugeDouble(_) => MetricKind::Gauge,
        }
    }

    /// Value widened to f64, for display and introspection
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::CounterInt(v) | Self::GaugeInt(v) => v as f64,
            Self::CounterLong(v) | Self::GaugeLong(v) => v as f64,
            Self::GaugeFloat(v) => v as f64,
            Self::GaugeDouble(v) => v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CounterInt(v) | Self::GaugeInt(v) => write!(f, "{}", v),
            Self::CounterLong(v) | Self::GaugeLong(v) => write!(f, "{}", v),
            Self::GaugeFloat(v) => write!(f, "{}", v),
            Self::GaugeDouble(v) => write!(f, "{}", v),
        }
    }
}

/// Immutable metric sample: metadata plus a typed value
#[derive(Clone, PartialEq)]
pub struct AbstractMetric {
    info: MetricsInfo,
    value: MetricValue,
}

impl AbstractMetric {
    pub fn new(info: MetricsInfo, value: MetricValue) -> Self {
        Self { info, value }
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

    #[inline]
    pub fn value(&self) -> MetricValue {
        self.value
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

impl fmt::Debug for AbstractMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::info;

    #[test]
    fn test_kinds() {
        assert_eq!(MetricValue::CounterLong(1).kind(), MetricKind::Counter);
        assert_eq!(MetricValue::CounterInt(1).kind(), MetricKind::Counter);
        assert_eq!(MetricValue::GaugeInt(1).kind(), MetricKind::Gauge);
        assert_eq!(MetricValue::GaugeDouble(1.0).kind(), MetricKind::Gauge);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(MetricValue::CounterLong(3).as_f64(), 3.0);
        assert_eq!(MetricValue::GaugeFloat(0.5).as_f64(), 0.5);
    }

    #[test]
    fn test_metric_accessors() {
        let m = AbstractMetric::new(info("Requests", "Total requests"), MetricValue::CounterLong(3));
        assert_eq!(m.name(), "Requests");
        assert_eq!(m.value(), MetricValue::CounterLong(3));
        assert_eq!(m.kind(), MetricKind::Counter);
        assert_eq!(format!("{:?}", m), "Requests=3");
    }
}
