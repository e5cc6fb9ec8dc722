//! Sink adapters — per-sink asynchronous delivery
//!
//! A [`SinkAdapter`] puts one sink behind a bounded drop-head queue and a
//! dedicated worker task. The sampling timer offers buffers without ever
//! blocking; the worker dequeues, filters and delivers them, retrying a
//! failed buffer on an exponential backoff schedule and dropping it after
//! `retry_count` consecutive failures. At most one delivery is in flight
//! per sink at any time, and delivery order follows submit order for every
//! buffer that is not discarded.
//!
//! Each adapter keeps `dropped`, `qsize` and `latency` stats that the
//! orchestrator's self-source reports.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tally_config::SinkConfig;
use tally_core::{
    info, Buffer, Filter, GlobFilter, MutableCounterInt, MutableGaugeInt, MutableStat,
    RecordBuilder, Sink, SinkError,
};

use crate::queue::SinkQueue;

/// A sink shared between its adapter's worker and the registration map
///
/// The mutex also enforces the single-delivery-in-flight contract.
pub type SharedSink = Arc<tokio::sync::Mutex<Box<dyn Sink>>>;

/// Delivery statistics of one sink adapter
#[derive(Debug, Clone)]
pub(crate) struct SinkAdapterStats {
    dropped: MutableCounterInt,
    qsize: MutableGaugeInt,
    latency: MutableStat,
}

impl SinkAdapterStats {
    fn new(name: &str) -> Self {
        Self {
            dropped: MutableCounterInt::new(
                info(&format!("Sink_{name}Dropped"), "Dropped updates per sink"),
                0,
            ),
            qsize: MutableGaugeInt::new(
                info(&format!("Sink_{name}Qsize"), "Queue size of sink"),
                0,
            ),
            latency: MutableStat::new(
                &format!("Sink_{name}Latency"),
                "Sink end to end latency",
                "Ops",
                "Time",
                false,
            ),
        }
    }

    /// Append the stats to the self-source record
    pub fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        self.dropped.snapshot(rb, all);
        self.qsize.snapshot(rb, all);
        self.latency.snapshot(rb, all);
    }

    pub fn dropped_count(&self) -> i32 {
        self.dropped.value()
    }
}

/// Wraps one sink behind a bounded queue and a consumer worker
pub struct SinkAdapter {
    name: String,
    description: String,
    period_ms: u64,
    immediate_wait: Duration,
    queue: Arc<SinkQueue<Buffer>>,
    stats: SinkAdapterStats,
    cancel: CancellationToken,
    pending: Mutex<Option<Worker>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SinkAdapter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sink: SharedSink,
        config: SinkConfig,
    ) -> Self {
        let name = name.into();
        let queue = Arc::new(SinkQueue::new(config.queue_capacity));
        let stats = SinkAdapterStats::new(&name);
        let cancel = CancellationToken::new();
        let worker = Worker {
            name: name.clone(),
            sink,
            queue: Arc::clone(&queue),
            stats: stats.clone(),
            cancel: cancel.clone(),
            source_filter: GlobFilter::from_spec(&config.source_filter),
            record_filter: GlobFilter::from_spec(&config.record_filter),
            metric_filter: GlobFilter::from_spec(&config.metric_filter),
            retry_delay: config.retry_delay,
            retry_backoff: config.retry_backoff.max(1.0),
            retry_count: config.retry_count.max(1),
            config,
        };
        Self {
            period_ms: worker.config.period.as_millis().max(1) as u64,
            immediate_wait: worker.config.period,
            description: description.into(),
            queue,
            stats,
            cancel,
            pending: Mutex::new(Some(worker)),
            worker: Mutex::new(None),
            name,
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

    pub(crate) fn stats(&self) -> SinkAdapterStats {
        self.stats.clone()
    }

    /// Spawn the consumer worker
    pub fn start(&self) {
        let Some(worker) = self.pending.lock().take() else {
            tracing::warn!(sink = %self.name, "sink adapter already started");
            return;
        };
        *self.worker.lock() = Some(tokio::spawn(worker.run()));
        tracing::debug!(sink = %self.name, period_ms = self.period_ms, "sink adapter started");
    }

    /// Timer-side enqueue: non-blocking, drop-head on overflow
    ///
    /// Ticks that are not a multiple of this sink's period are accepted
    /// trivially. Returns false when a buffer was lost to overflow.
    pub fn put_metrics(&self, buffer: Buffer, logical_time: u64) -> bool {
        if logical_time % self.period_ms != 0 {
            return true;
        }
        let accepted = self.queue.offer(buffer);
        self.stats.qsize.set(self.queue.len() as i32);
        if !accepted {
            self.stats.dropped.incr();
            tracing::debug!(sink = %self.name, "queue full, discarded oldest buffer");
        }
        accepted
    }

    /// On-demand enqueue: waits up to one period for space, never discards
    pub async fn put_metrics_immediate(&self, buffer: Buffer) -> bool {
        let accepted = self.queue.offer_wait(buffer, self.immediate_wait).await;
        self.stats.qsize.set(self.queue.len() as i32);
        if !accepted {
            self.stats.dropped.incr();
            tracing::warn!(sink = %self.name, "timed out enqueueing on-demand publish");
        }
        accepted
    }

    /// Signal the worker and join it with a bounded wait
    ///
    /// A worker stuck in a sink call is abandoned after the wait and logged.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.queue.close();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(self.immediate_wait, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => {
                    tracing::warn!(sink = %self.name, error = %join_error, "sink worker panicked")
                }
                Err(_) => {
                    tracing::warn!(sink = %self.name, "sink worker did not stop in time, abandoning")
                }
            }
        }
        tracing::debug!(sink = %self.name, "sink adapter stopped");
    }
}

/// Consumer side: dequeues buffers and delivers them through the sink
struct Worker {
    name: String,
    sink: SharedSink,
    queue: Arc<SinkQueue<Buffer>>,
    stats: SinkAdapterStats,
    cancel: CancellationToken,
    config: SinkConfig,
    source_filter: Option<GlobFilter>,
    record_filter: Option<GlobFilter>,
    metric_filter: Option<GlobFilter>,
    retry_delay: Duration,
    retry_backoff: f64,
    retry_count: u32,
}

impl Worker {
    async fn run(self) {
        let mut sink = self.sink.lock().await;
        sink.configure(&self.config);

        loop {
            let buffer = tokio::select! {
                _ = self.cancel.cancelled() => break,
                item = self.queue.dequeue() => match item {
                    Some(buffer) => buffer,
                    None => break,
                },
            };
            self.stats.qsize.set(self.queue.len() as i32);
            self.deliver_with_retry(&mut sink, &buffer).await;
        }
        tracing::debug!(sink = %self.name, "sink worker exiting");
    }

    /// Deliver one buffer, backing off between consecutive failures
    async fn deliver_with_retry(
        &self,
        sink: &mut tokio::sync::MutexGuard<'_, Box<dyn Sink>>,
        buffer: &Buffer,
    ) {
        let mut failures: u32 = 0;
        loop {
            let start = Instant::now();
            match self.deliver(sink, buffer).await {
                Ok(()) => {
                    self.stats
                        .latency
                        .add(start.elapsed().as_secs_f64() * 1_000.0);
                    return;
                }
                Err(error) => {
                    failures += 1;
                    if failures >= self.retry_count {
                        tracing::warn!(
                            sink = %self.name,
                            error = %error,
                            failures,
                            "dropping buffer after repeated delivery failures"
                        );
                        self.stats.dropped.incr();
                        return;
                    }
                    let delay = self
                        .retry_delay
                        .mul_f64(self.retry_backoff.powi(failures as i32 - 1));
                    tracing::debug!(
                        sink = %self.name,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "delivery failed, backing off"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            // shutting down: one last attempt, then give up
                            if let Err(error) = self.deliver(sink, buffer).await {
                                tracing::warn!(sink = %self.name, error = %error, "dropping buffer at shutdown");
                                self.stats.dropped.incr();
                            }
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One delivery attempt: filter, put each record, flush once
    async fn deliver(
        &self,
        sink: &mut tokio::sync::MutexGuard<'_, Box<dyn Sink>>,
        buffer: &Buffer,
    ) -> Result<(), SinkError> {
        for entry in buffer.iter() {
            if let Some(filter) = &self.source_filter {
                if !filter.accepts_name(entry.source_name()) {
                    continue;
                }
            }
            for record in entry.records() {
                if let Some(filter) = &self.record_filter {
                    if !filter.accepts_name(record.name()) || !filter.accepts_tags(record.tags())
                    {
                        continue;
                    }
                }
                match &self.metric_filter {
                    Some(filter) => sink.put_metrics(&record.filtered(filter)).await?,
                    None => sink.put_metrics(record).await?,
                }
            }
        }
        sink.flush().await
    }
}

#[cfg(test)]
#[path = "sink_adapter_test.rs"]
mod sink_adapter_test;
