//! Mutable metrics
//!
//! The producer-facing accumulators. Every mutable metric is a cheap
//! cloneable handle over an `Arc`-shared cell: producers keep one handle and
//! mutate through it, the owning registry keeps another and reads it at
//! snapshot time. Counters and gauges update atomically; stats take a short
//! lock per sample.
//!
//! Each metric carries a changed flag, set by every mutation and cleared by
//! every emitted snapshot. A `snapshot(builder, all)` call emits the current
//! value when `all` is true or the flag is set, and nothing otherwise.

mod counter;
mod gauge;
mod stat;

pub use counter::{MutableCounterInt, MutableCounterLong};
pub use gauge::{
    MutableFnGauge, MutableGaugeDouble, MutableGaugeFloat, MutableGaugeInt, MutableGaugeLong,
};
pub use stat::MutableStat;

use crate::collector::RecordBuilder;
use crate::info::MetricsInfo;

/// A registered mutable metric of any type
#[derive(Debug, Clone)]
pub enum MutableMetric {
    CounterInt(MutableCounterInt),
    CounterLong(MutableCounterLong),
    GaugeInt(MutableGaugeInt),
    GaugeLong(MutableGaugeLong),
    GaugeFloat(MutableGaugeFloat),
    GaugeDouble(MutableGaugeDouble),
    Stat(MutableStat),
    FnGauge(MutableFnGauge),
}

impl MutableMetric {
    /// Metadata for this metric
    pub fn info(&self) -> MetricsInfo {
        match self {
            Self::CounterInt(m) => m.info(),
            Self::CounterLong(m) => m.info(),
            Self::GaugeInt(m) => m.info(),
            Self::GaugeLong(m) => m.info(),
            Self::GaugeFloat(m) => m.info(),
            Self::GaugeDouble(m) => m.info(),
            Self::Stat(m) => m.info(),
            Self::FnGauge(m) => m.info(),
        }
    }

    /// Append the current sample to `rb` when `all` is set or the metric
    /// changed since the last emitted snapshot
    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        match self {
            Self::CounterInt(m) => m.snapshot(rb, all),
            Self::CounterLong(m) => m.snapshot(rb, all),
            Self::GaugeInt(m) => m.snapshot(rb, all),
            Self::GaugeLong(m) => m.snapshot(rb, all),
            Self::GaugeFloat(m) => m.snapshot(rb, all),
            Self::GaugeDouble(m) => m.snapshot(rb, all),
            Self::Stat(m) => m.snapshot(rb, all),
            Self::FnGauge(m) => m.snapshot(rb, all),
        }
    }
}

impl From<MutableCounterInt> for MutableMetric {
    fn from(m: MutableCounterInt) -> Self {
        Self::CounterInt(m)
    }
}

impl From<MutableCounterLong> for MutableMetric {
    fn from(m: MutableCounterLong) -> Self {
        Self::CounterLong(m)
    }
}

impl From<MutableGaugeInt> for MutableMetric {
    fn from(m: MutableGaugeInt) -> Self {
        Self::GaugeInt(m)
    }
}

impl From<MutableGaugeLong> for MutableMetric {
    fn from(m: MutableGaugeLong) -> Self {
        Self::GaugeLong(m)
    }
}

impl From<MutableGaugeFloat> for MutableMetric {
    fn from(m: MutableGaugeFloat) -> Self {
        Self::GaugeFloat(m)
    }
}

impl From<MutableGaugeDouble> for MutableMetric {
    fn from(m: MutableGaugeDouble) -> Self {
        Self::GaugeDouble(m)
    }
}

impl From<MutableStat> for MutableMetric {
    fn from(m: MutableStat) -> Self {
        Self::Stat(m)
    }
}

impl From<MutableFnGauge> for MutableMetric {
    fn from(m: MutableFnGauge) -> Self {
        Self::FnGauge(m)
    }
}
