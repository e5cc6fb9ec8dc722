//! Metrics sinks
//!
//! A [`Sink`] externalizes records: files, consoles, aggregation services.
//! Sinks are plugins; the system only knows this contract. Delivery runs on
//! the sink's own worker task, so implementations may block on I/O.
//!
//! Per buffer, the adapter calls `put_metrics` once per surviving record and
//! `flush` once after the last one. Either may fail; failures trigger the
//! adapter's retry schedule and never reach producers.

use async_trait::async_trait;
use thiserror::Error;

use tally_config::SinkConfig;

use crate::record::Record;

/// Delivery failure reported by a sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection error (for network sinks)
    #[error("connection error: {0}")]
    Connection(String),

    /// Failed to hand a record to the destination
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Failed to flush buffered records
    #[error("flush failed: {0}")]
    Flush(String),
}

impl SinkError {
    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}

/// Consumer-side plugin receiving records
#[async_trait]
pub trait Sink: Send {
    /// Called once by the adapter before the first delivery
    fn configure(&mut self, _config: &SinkConfig) {}

    /// Deliver one record
    async fn put_metrics(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush after the last record of a buffer
    async fn flush(&mut self) -> Result<(), SinkError>;
}
