//! Tally - System
//!
//! The metrics system orchestrator: registration, lifecycle, the sampling
//! timer, and per-sink asynchronous delivery.
//!
//! # Architecture
//!
//! ```text
//! producers ──(atomic updates)──> MutableMetric handles
//!                                       │
//! [Timer task] ── sample ──> SourceAdapter.get_metrics(collector, all)
//!                                       │
//!                                    Buffer ──┬──> SinkAdapter queue ──> worker ──> Sink A
//!                                             └──> SinkAdapter queue ──> worker ──> Sink B
//! ```
//!
//! One timer tick samples every registered source into an immutable buffer
//! and offers it to every sink's bounded queue without blocking. Each sink
//! drains its queue on a dedicated worker with its own retry state machine,
//! so a slow or failing sink never stalls producers, the timer, or other
//! sinks.
//!
//! # Example
//!
//! ```ignore
//! let system = MetricsSystem::new("app");
//! system.set_config(MetricsConfig::from_toml_str(CONFIG)?).await;
//! system.register_sink("file", "file sink", Box::new(file_sink)).await;
//! system.register_source(None, None, &mut my_metrics).await?;
//! system.init("app").await;
//! // ... producers mutate handles; the timer publishes every period
//! system.shutdown().await;
//! ```

mod beans;
mod callback;
mod default;
mod queue;
mod sink_adapter;
mod source_adapter;
mod system;

pub use beans::{
    attribute as bean_attribute, get as bean, register as register_bean,
    unregister as unregister_bean, AttributeValue, MetricsView,
};
pub use callback::Callback;
pub use default::{
    in_mini_cluster_mode, initialize, instance, set_mini_cluster_mode, shutdown, source_name,
};
pub use sink_adapter::{SharedSink, SinkAdapter};
pub use source_adapter::SourceAdapter;
pub use system::{MetricsSystem, INIT_MODE_ENV};
