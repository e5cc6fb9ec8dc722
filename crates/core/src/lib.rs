//! Tally - Core
//!
//! Data model and metric primitives for the tally metrics system.
//!
//! # Overview
//!
//! This crate provides:
//! - Interned metadata ([`MetricsInfo`], [`Tag`]) shared across snapshots
//! - Immutable samples, records and delivery buffers
//! - Mutable metrics (counters, gauges, stats) as lock-free `Arc` handles
//! - Per-source registries and the collector/record-builder staging pipeline
//! - The [`Source`], [`Sink`] and [`Filter`] contracts
//! - Declarative source building ([`MetricsDecl`] + [`SourceBuilder`])
//!
//! # Handle pattern
//!
//! Mutable metrics and registries are cheap cloneable handles over shared
//! cells. Producers keep one handle and mutate through atomics; the
//! sampling side keeps another and reads point-in-time snapshots:
//!
//! ```text
//! producer ── MutableCounterLong ──┐
//!                                  ├── shared cell (atomics + changed flag)
//! registry ── MutableMetric ───────┘
//!        │
//!        └── snapshot(builder, all) → AbstractMetric → Record → Buffer
//! ```

mod buffer;
mod collector;
mod error;
mod filter;
mod info;
mod metric;
mod mutable;
mod record;
mod registry;
mod sink;
mod source;
mod tag;

pub use buffer::{Buffer, BufferBuilder, BufferEntry};
pub use collector::{Collector, RecordBuilder};
pub use error::{MetricsError, Result};
pub use filter::{Filter, GlobFilter};
pub use info::{context_info, info, MetricsInfo};
pub use metric::{AbstractMetric, MetricKind, MetricValue};
pub use mutable::{
    MutableCounterInt, MutableCounterLong, MutableFnGauge, MutableGaugeDouble, MutableGaugeFloat,
    MutableGaugeInt, MutableGaugeLong, MutableMetric, MutableStat,
};
pub use record::Record;
pub use registry::MetricsRegistry;
pub use sink::{Sink, SinkError};
pub use source::{DeclInfo, MetricsDecl, Source, SourceBuilder};
pub use tag::{tag, Tag};
