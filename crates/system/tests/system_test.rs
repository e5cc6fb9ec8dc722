//! End-to-end metrics system tests
//!
//! These tests run the whole pipeline: declarative sources bound through
//! the orchestrator, the sampling timer, and recording sinks behind real
//! adapter queues and workers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tally_config::MetricsConfig;
use tally_core::{
    info, DeclInfo, MetricValue, MetricsDecl, MetricsRegistry, MutableCounterLong, Record, Result,
    Sink, SinkError,
};
use tally_system::{Callback, MetricsSystem};

// ============================================================================
// Test fixtures
// ============================================================================

/// Declarative source with one counter, in the given context
struct CounterSource {
    name: &'static str,
    context: &'static str,
    requests: Option<MutableCounterLong>,
}

impl CounterSource {
    fn new(name: &'static str, context: &'static str) -> Self {
        Self {
            name,
            context,
            requests: None,
        }
    }

    fn requests(&self) -> &MutableCounterLong {
        self.requests.as_ref().expect("declared after registration")
    }
}

impl MetricsDecl for CounterSource {
    fn decl(&self) -> DeclInfo {
        DeclInfo::new(self.name)
            .about("test counter source")
            .context(self.context)
    }

    fn declare(&mut self, registry: &MetricsRegistry) -> Result<bool> {
        if self.requests.is_none() {
            self.requests = Some(registry.new_counter(info("Requests", "Total requests"), 0)?);
        }
        Ok(true)
    }
}

/// Everything a recording sink has seen, grouped into delivered buffers
#[derive(Clone, Default)]
struct Recording {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    current: Vec<Record>,
    buffers: Vec<Vec<Record>>,
}

impl Recording {
    fn buffer_count(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    fn buffers(&self) -> Vec<Vec<Record>> {
        self.inner.lock().buffers.clone()
    }

    fn records(&self) -> Vec<Record> {
        self.inner.lock().buffers.iter().flatten().cloned().collect()
    }

    /// Latest delivered value of a counter/gauge metric, searching newest first
    fn latest_value(&self, metric: &str) -> Option<MetricValue> {
        self.records()
            .iter()
            .rev()
            .flat_map(|r| r.metrics().iter())
            .find(|m| m.name() == metric)
            .map(|m| m.value())
    }
}

/// Sink that records deliveries; optionally slow or initially failing
struct RecordingSink {
    recording: Recording,
    delay: Duration,
    fail_remaining: Arc<AtomicU32>,
}

impl RecordingSink {
    fn new(recording: Recording) -> Self {
        Self {
            recording,
            delay: Duration::ZERO,
            fail_remaining: Arc::new(AtomicU32::new(0)),
        }
    }

    fn slow(recording: Recording, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(recording)
        }
    }

    fn failing_first(recording: Recording, failures: u32) -> Self {
        Self {
            fail_remaining: Arc::new(AtomicU32::new(failures)),
            ..Self::new(recording)
        }
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn put_metrics(&mut self, record: &Record) -> std::result::Result<(), SinkError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_remaining.load(Ordering::SeqCst) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(SinkError::delivery("induced failure"));
        }
        self.recording.inner.lock().current.push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> std::result::Result<(), SinkError> {
        let mut state = self.recording.inner.lock();
        let current = std::mem::take(&mut state.current);
        state.buffers.push(current);
        Ok(())
    }
}

#[derive(Default)]
struct CountingCallback {
    post_starts: AtomicU32,
}

impl Callback for CountingCallback {
    fn post_start(&self) {
        self.post_starts.fetch_add(1, Ordering::SeqCst);
    }
}

async fn eventually(what: &str, mut probe: impl FnMut() -> bool) {
    for _ in 0..400 {
        if probe() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for: {what}");
}

fn fast_config() -> MetricsConfig {
    MetricsConfig::from_toml_str(r#"period = "100ms""#).expect("valid config")
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_counter_round_trip() {
    let system = MetricsSystem::new("e2e_roundtrip");
    system.set_config(fast_config()).await;

    let mut source = CounterSource::new("RoundTripSource", "testctx");
    system
        .register_source(None, None, &mut source)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_roundtrip").await;
    assert!(system.is_monitoring().await);

    source.requests().incr_by(3);

    eventually("a delivered buffer carrying the mutated counter", || {
        recording.latest_value("Requests") == Some(MetricValue::CounterLong(3))
    })
    .await;

    let records = recording.records();
    let record = records
        .iter()
        .rev()
        .find(|r| r.name() == "RoundTripSource")
        .expect("source record delivered");

    assert_eq!(record.context(), Some("testctx"));
    let hostname = record
        .tags()
        .iter()
        .find(|t| t.name() == "Hostname")
        .expect("hostname tag injected");
    assert!(!hostname.value().is_empty());

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_sink_drops_but_stays_fresh() {
    let system = MetricsSystem::new("e2e_drops");
    let config = MetricsConfig::from_toml_str(
        r#"
period = "100ms"

[sink.slow]
period = "100ms"
queue_capacity = 1
"#,
    )
    .expect("valid config");
    system.set_config(config).await;

    let mut source = CounterSource::new("DropSource", "testctx");
    system
        .register_source(None, None, &mut source)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "slow",
            "slow sink",
            Box::new(RecordingSink::slow(
                recording.clone(),
                Duration::from_millis(250),
            )),
        )
        .await;

    system.init("e2e_drops").await;

    // the timer outpaces the sink, so the queue keeps discarding its head;
    // the self-source eventually reports the drops to the surviving buffers
    eventually("dropped updates reported by the self-source", || {
        matches!(
            recording.latest_value("DroppedPubAll"),
            Some(MetricValue::CounterLong(n)) if n >= 2
        )
    })
    .await;

    assert!(recording.buffer_count() >= 1);
    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_source_filter_selects_sources() {
    let system = MetricsSystem::new("e2e_filter");
    let config = MetricsConfig::from_toml_str(
        r#"
period = "100ms"

[source_filter]
include = ["FilterGood*"]
"#,
    )
    .expect("valid config");
    system.set_config(config).await;

    let mut good = CounterSource::new("FilterGood1", "testctx");
    let mut bad = CounterSource::new("FilterBad1", "testctx");
    system
        .register_source(None, None, &mut good)
        .await
        .expect("source registers");
    system
        .register_source(None, None, &mut bad)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_filter").await;

    eventually("records from the accepted source", || {
        recording.records().iter().any(|r| r.name() == "FilterGood1")
    })
    .await;

    assert!(
        !recording.records().iter().any(|r| r.name() == "FilterBad1"),
        "filtered source must not reach the sink"
    );

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retry_then_succeed() {
    let system = MetricsSystem::new("e2e_retry");
    let config = MetricsConfig::from_toml_str(
        r#"
[sink.flaky]
period = "10s"
retry_delay = "10ms"
retry_backoff = 2.0
retry_count = 3
"#,
    )
    .expect("valid config");
    system.set_config(config).await;

    let mut source = CounterSource::new("RetrySource", "testctx");
    system
        .register_source(None, None, &mut source)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "flaky",
            "flaky sink",
            Box::new(RecordingSink::failing_first(recording.clone(), 2)),
        )
        .await;

    system.init("e2e_retry").await;

    let started = std::time::Instant::now();
    system.publish_metrics_now().await;

    eventually("the buffer delivered after retries", || {
        recording.buffer_count() == 1
    })
    .await;

    // two failed attempts backed off 10ms then 20ms before the success
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(recording
        .records()
        .iter()
        .any(|r| r.name() == "RetrySource"));

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hybrid_misuse_leaves_system_unchanged() {
    struct BadHybrid {
        requests: Option<MutableCounterLong>,
    }

    impl MetricsDecl for BadHybrid {
        fn decl(&self) -> DeclInfo {
            DeclInfo::new("BadHybrid")
        }

        fn declare(&mut self, registry: &MetricsRegistry) -> Result<bool> {
            if self.requests.is_none() {
                self.requests =
                    Some(registry.new_counter(info("Requests", "Total requests"), 0)?);
            }
            Ok(true)
        }
    }

    #[derive(Debug)]
    struct NullSource;

    impl tally_core::Source for NullSource {
        fn get_metrics(&self, _collector: &mut tally_core::Collector, _all: bool) {}
    }

    let system = MetricsSystem::new("e2e_hybrid");
    let monitoring_before = system.is_monitoring().await;

    let mut object = BadHybrid { requests: None };
    let error = system
        .register_hybrid_source("BadHybrid", "bad hybrid", &mut object, Arc::new(NullSource))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        tally_core::MetricsError::HybridWithoutRegistry
    ));
    assert!(system.source("BadHybrid").await.is_none());
    assert_eq!(system.is_monitoring().await, monitoring_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_preserves_registrations() {
    let system = MetricsSystem::new("e2e_restart");
    system.set_config(fast_config()).await;

    let callback = Arc::new(CountingCallback::default());
    system.register_callback(callback.clone()).await;

    let mut source = CounterSource::new("RestartSource", "testctx");
    system
        .register_source(None, None, &mut source)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_restart").await;
    eventually("first delivery", || recording.buffer_count() >= 1).await;

    system.stop().await;
    assert!(!system.is_monitoring().await);
    let buffers_after_stop = recording.buffer_count();

    system.start().await.expect("restart succeeds");
    assert!(system.is_monitoring().await);
    assert_eq!(callback.post_starts.load(Ordering::SeqCst), 2);

    source.requests().incr_by(5);
    eventually("a post-restart delivery with the source record", || {
        recording
            .buffers()
            .iter()
            .skip(buffers_after_stop)
            .flatten()
            .any(|r| r.name() == "RestartSource")
    })
    .await;

    // the post-restart snapshot carries the counter's preserved identity
    eventually("the preserved counter value", || {
        matches!(
            recording.latest_value("Requests"),
            Some(MetricValue::CounterLong(5))
        )
    })
    .await;

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unregistered_source_leaves_the_stream() {
    let system = MetricsSystem::new("e2e_unregister");
    system.set_config(fast_config()).await;

    let mut keep = CounterSource::new("UnregKeep", "testctx");
    let mut drop_me = CounterSource::new("UnregGone", "testctx");
    system
        .register_source(None, None, &mut keep)
        .await
        .expect("source registers");
    system
        .register_source(None, None, &mut drop_me)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_unregister").await;
    eventually("both sources delivered", || {
        let records = recording.records();
        records.iter().any(|r| r.name() == "UnregKeep")
            && records.iter().any(|r| r.name() == "UnregGone")
    })
    .await;

    system.unregister_source("UnregGone").await;
    // allow one in-flight buffer to drain
    let cutoff = recording.buffer_count() + 1;

    eventually("buffers beyond the cutoff", || {
        recording.buffer_count() > cutoff + 2
    })
    .await;

    let late_records: Vec<String> = recording
        .buffers()
        .iter()
        .skip(cutoff)
        .flatten()
        .map(|r| r.name().to_string())
        .collect();
    assert!(late_records.iter().any(|n| n == "UnregKeep"));
    assert!(
        !late_records.iter().any(|n| n == "UnregGone"),
        "unregistered source appeared after its removal"
    );

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_twin_registrations_before_start_get_distinct_names() {
    let system = MetricsSystem::new("e2e_twins");
    system.set_config(fast_config()).await;

    // two identically-named components registered before monitoring starts
    let mut first = CounterSource::new("TwinSource", "one");
    let mut second = CounterSource::new("TwinSource", "two");
    let first_name = system
        .register_source(None, None, &mut first)
        .await
        .expect("source registers");
    let second_name = system
        .register_source(None, None, &mut second)
        .await
        .expect("source registers");

    assert_eq!(first_name, "TwinSource");
    assert_eq!(second_name, "TwinSource-1");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_twins").await;

    // both registrations sample: one buffer carries a record from each
    eventually("a buffer with records from both twins", || {
        recording
            .buffers()
            .iter()
            .any(|b| b.iter().filter(|r| r.name() == "TwinSource").count() == 2)
    })
    .await;

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reregistration_while_monitoring_replaces_the_source() {
    let system = MetricsSystem::new("e2e_replace");
    system.set_config(fast_config()).await;

    let mut before = CounterSource::new("ReplaceSource", "before");
    system
        .register_source(None, None, &mut before)
        .await
        .expect("source registers");

    let recording = Recording::default();
    system
        .register_sink(
            "recording",
            "recording sink",
            Box::new(RecordingSink::new(recording.clone())),
        )
        .await;

    system.init("e2e_replace").await;
    eventually("a delivery from the first registration", || {
        recording
            .records()
            .iter()
            .any(|r| r.name() == "ReplaceSource" && r.context() == Some("before"))
    })
    .await;

    // same name on a monitoring system: reused as-is, replacing the source
    let mut after = CounterSource::new("ReplaceSource", "after");
    let name = system
        .register_source(None, None, &mut after)
        .await
        .expect("source registers");
    assert_eq!(name, "ReplaceSource");

    eventually("a delivery from the replacement", || {
        recording
            .records()
            .iter()
            .any(|r| r.name() == "ReplaceSource" && r.context() == Some("after"))
    })
    .await;

    // the old registration is gone, not shadowed underneath the new one
    let cutoff = recording.buffer_count() + 1;
    eventually("buffers beyond the cutoff", || {
        recording.buffer_count() > cutoff + 2
    })
    .await;
    assert!(
        !recording
            .buffers()
            .iter()
            .skip(cutoff)
            .flatten()
            .any(|r| r.name() == "ReplaceSource" && r.context() == Some("before")),
        "replaced source kept publishing"
    );

    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_init_shutdown_refcount() {
    let system = MetricsSystem::new("e2e_refcount");
    system.set_config(fast_config()).await;

    system.init("e2e_refcount").await;
    tally_system::set_mini_cluster_mode(true);
    system.init("e2e_refcount").await;
    tally_system::set_mini_cluster_mode(false);

    // two inits: the first shutdown only decrements
    assert!(!system.shutdown().await);
    assert!(system.is_monitoring().await);

    assert!(system.shutdown().await);
    assert!(!system.is_monitoring().await);

    // redundant shutdown reports already-done
    assert!(system.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_publish_metrics_now_without_sinks_is_a_no_op() {
    let system = MetricsSystem::new("e2e_nosinks");
    system.set_config(fast_config()).await;

    let mut source = CounterSource::new("NoSinkSource", "testctx");
    system
        .register_source(None, None, &mut source)
        .await
        .expect("source registers");

    system.init("e2e_nosinks").await;
    system.publish_metrics_now().await;
    assert!(system.shutdown().await);
}
