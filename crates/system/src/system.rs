//! The metrics system orchestrator
//!
//! [`MetricsSystem`] owns everything: the registered sources and sinks, the
//! sampling timer, the collector, and its own self-metrics. The public API
//! is serialized on a single async mutex, so at most one of
//! start/stop/register/sample/publish runs at a time; producers never take
//! that lock, they mutate metric handles directly.
//!
//! Each timer tick samples every accepted source into a buffer and fans the
//! buffer out to every sink adapter with a non-blocking enqueue. Sources
//! and sinks survive restarts: registrations are kept by name and re-bound
//! against fresh configuration by the post-start rebind pass.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tally_config::{ConfigError, MetricsConfig, SinkConfig, SourceConfig};
use tally_core::{
    info, tag, Buffer, BufferBuilder, Collector, Filter, GlobFilter, MetricsDecl, MetricsError,
    MutableCounterLong, MutableStat, RecordBuilder, Sink, Source, SourceBuilder, Tag,
};

use crate::beans::{self, AttributeValue, MetricsView};
use crate::callback::{Callback, GuardedCallback};
use crate::default;
use crate::sink_adapter::{SharedSink, SinkAdapter, SinkAdapterStats};
use crate::source_adapter::SourceAdapter;

/// Environment variable selecting the initialization mode
pub const INIT_MODE_ENV: &str = "TALLY_INIT_MODE";

const SYSTEM_NAME: &str = "MetricsSystem";
const SYSTEM_STATS_NAME: &str = "MetricsSystem,sub=Stats";
const SYSTEM_STATS_DESC: &str = "Metrics system metrics";
const SYSTEM_CONTROL_NAME: &str = "MetricsSystem,sub=Control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitMode {
    Normal,
    Standby,
}

fn init_mode() -> InitMode {
    match std::env::var(INIT_MODE_ENV) {
        Ok(mode) if mode.eq_ignore_ascii_case("standby") => InitMode::Standby,
        _ => InitMode::Normal,
    }
}

/// Orchestrator handle; clones share one system
#[derive(Clone)]
pub struct MetricsSystem {
    inner: Arc<SystemInner>,
}

struct SystemInner {
    state: tokio::sync::Mutex<SystemState>,
    period_ms: Arc<AtomicU64>,
    stats: Arc<SystemStats>,
}

struct RegisteredSource {
    name: String,
    description: String,
    source: Arc<dyn Source>,
}

struct RegisteredSink {
    name: String,
    description: String,
    sink: SharedSink,
}

/// Named callbacks are held by name, not by reference: at post-start the
/// registration maps are consulted again, so a restart re-binds against the
/// freshly loaded configuration.
#[derive(Clone, Copy)]
enum Rebind {
    Source,
    Sink,
}

struct TimerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct SystemState {
    prefix: String,
    ref_count: u32,
    monitoring: bool,
    configured: bool,
    supplied_config: MetricsConfig,
    period: Duration,
    logical_time: u64,
    collector: Collector,
    injected_tags: Vec<Tag>,
    source_filter: Option<Arc<dyn Filter>>,
    sink_configs: BTreeMap<String, SinkConfig>,
    source_configs: BTreeMap<String, SourceConfig>,
    sources: Vec<(String, Arc<SourceAdapter>)>,
    all_sources: Vec<RegisteredSource>,
    sinks: Vec<(String, Arc<SinkAdapter>)>,
    all_sinks: Vec<RegisteredSink>,
    callbacks: Vec<GuardedCallback>,
    named_callbacks: Vec<(String, Rebind)>,
    timer: Option<TimerHandle>,
    sys_source: Option<Arc<SourceAdapter>>,
    control_bean: Option<String>,
}

/// Self-metrics shared between the orchestrator and its system source
#[derive(Debug)]
struct SystemStats {
    snapshot_stat: MutableStat,
    publish_stat: MutableStat,
    dropped_pub_all: MutableCounterLong,
    num_active_sources: AtomicUsize,
    num_all_sources: AtomicUsize,
    num_active_sinks: AtomicUsize,
    num_all_sinks: AtomicUsize,
    sink_stats: Mutex<Vec<(String, SinkAdapterStats)>>,
}

impl SystemStats {
    fn new() -> Self {
        Self {
            snapshot_stat: MutableStat::new("Snapshot", "Snapshot stats", "Ops", "Time", false),
            publish_stat: MutableStat::new("Publish", "Publishing stats", "Ops", "Time", false),
            dropped_pub_all: MutableCounterLong::new(
                info("DroppedPubAll", "Dropped updates by all sinks"),
                0,
            ),
            num_active_sources: AtomicUsize::new(0),
            num_all_sources: AtomicUsize::new(0),
            num_active_sinks: AtomicUsize::new(0),
            num_all_sinks: AtomicUsize::new(0),
            sink_stats: Mutex::new(Vec::new()),
        }
    }

    fn snapshot(&self, rb: &mut RecordBuilder, all: bool) {
        self.snapshot_stat.snapshot(rb, all);
        self.publish_stat.snapshot(rb, all);
        self.dropped_pub_all.snapshot(rb, all);
    }
}

/// The orchestrator's own source: registration counts, per-sink delivery
/// stats, and the snapshot/publish latency summaries
#[derive(Debug)]
struct SystemSource {
    stats: Arc<SystemStats>,
}

impl Source for SystemSource {
    fn get_metrics(&self, collector: &mut Collector, all: bool) {
        let rb = collector.add_record_named(SYSTEM_NAME);
        rb.add_gauge_int(
            info("NumActiveSources", "Number of active metrics sources"),
            self.stats.num_active_sources.load(Ordering::Relaxed) as i32,
        )
        .add_gauge_int(
            info("NumAllSources", "Number of all registered metrics sources"),
            self.stats.num_all_sources.load(Ordering::Relaxed) as i32,
        )
        .add_gauge_int(
            info("NumActiveSinks", "Number of active metrics sinks"),
            self.stats.num_active_sinks.load(Ordering::Relaxed) as i32,
        )
        .add_gauge_int(
            info("NumAllSinks", "Number of all registered metrics sinks"),
            self.stats.num_all_sinks.load(Ordering::Relaxed) as i32,
        );
        for (_, sink_stats) in self.stats.sink_stats.lock().iter() {
            sink_stats.snapshot(rb, all);
        }
        self.stats.snapshot(rb, all);
    }
}

/// Introspection view over the orchestrator's timer settings
struct ControlBean {
    period_ms: Arc<AtomicU64>,
}

impl MetricsView for ControlBean {
    fn attributes(&self) -> Vec<(String, AttributeValue)> {
        let seconds = self.period_ms.load(Ordering::Relaxed) as f64 / 1_000.0;
        vec![("Period".to_string(), AttributeValue::Float(seconds))]
    }
}

impl MetricsSystem {
    /// Create an unconfigured system for `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SystemInner {
                state: tokio::sync::Mutex::new(SystemState {
                    prefix: prefix.into(),
                    ref_count: 0,
                    monitoring: false,
                    configured: false,
                    supplied_config: MetricsConfig::default(),
                    period: Duration::from_secs(10),
                    logical_time: 0,
                    collector: Collector::new(),
                    injected_tags: Vec::new(),
                    source_filter: None,
                    sink_configs: BTreeMap::new(),
                    source_configs: BTreeMap::new(),
                    sources: Vec::new(),
                    all_sources: Vec::new(),
                    sinks: Vec::new(),
                    all_sinks: Vec::new(),
                    callbacks: Vec::new(),
                    named_callbacks: Vec::new(),
                    timer: None,
                    sys_source: None,
                    control_bean: None,
                }),
                period_ms: Arc::new(AtomicU64::new(10_000)),
                stats: Arc::new(SystemStats::new()),
            }),
        }
    }

    /// Supply the configuration picked up at the next start
    pub async fn set_config(&self, config: MetricsConfig) {
        self.inner.state.lock().await.supplied_config = config;
    }

    /// Initialize under `prefix`: refcounted and idempotent
    ///
    /// In NORMAL mode the first init also starts monitoring; configuration
    /// faults are logged and leave the system configured-but-idle. STANDBY
    /// mode (via [`INIT_MODE_ENV`]) waits for an explicit start.
    pub async fn init(&self, prefix: &str) {
        let mut st = self.inner.state.lock().await;
        if st.monitoring && !default::in_mini_cluster_mode() {
            tracing::warn!(prefix = %st.prefix, "metrics system already initialized");
            return;
        }
        st.prefix = prefix.to_string();
        st.ref_count += 1;
        if st.monitoring {
            // repeated init inside a mini cluster
            tracing::info!(prefix = %st.prefix, "metrics system started (again)");
            return;
        }
        match init_mode() {
            InitMode::Normal => {
                if let Err(error) = self.start_locked(&mut st).await {
                    tracing::warn!(prefix = %st.prefix, error = %error, "metrics system not started");
                }
            }
            InitMode::Standby => {
                tracing::info!(prefix = %st.prefix, "metrics system started in standby mode");
            }
        }
        self.register_control_bean(&mut st);
    }

    /// Start monitoring; no-op with a warning when already started
    pub async fn start(&self) -> Result<(), ConfigError> {
        let mut st = self.inner.state.lock().await;
        self.start_locked(&mut st).await
    }

    /// Stop monitoring, reversing start
    pub async fn stop(&self) {
        let mut st = self.inner.state.lock().await;
        self.stop_locked(&mut st).await;
    }

    /// Release one init reference; on the last one, stop and tear down
    ///
    /// Returns true exactly when the system reached the torn-down state.
    pub async fn shutdown(&self) -> bool {
        let mut st = self.inner.state.lock().await;
        tracing::debug!(ref_count = st.ref_count, "metrics system shutdown requested");
        if st.ref_count == 0 {
            tracing::debug!("redundant shutdown");
            return true;
        }
        st.ref_count -= 1;
        if st.ref_count > 0 {
            return false;
        }
        if st.monitoring {
            self.stop_locked(&mut st).await;
        }
        st.all_sources.clear();
        st.all_sinks.clear();
        st.callbacks.clear();
        st.named_callbacks.clear();
        if let Some(bean) = st.control_bean.take() {
            beans::unregister(&bean);
        }
        self.refresh_counts(&mut st);
        tracing::info!(prefix = %st.prefix, "metrics system shutdown complete");
        true
    }

    /// Register a declarative source (see [`MetricsDecl`])
    ///
    /// `name` and `description` default to the object's own declaration.
    /// Structural misuse (no declared metrics) fails without touching any
    /// system state.
    pub async fn register_source(
        &self,
        name: Option<&str>,
        description: Option<&str>,
        object: &mut dyn MetricsDecl,
    ) -> Result<String, MetricsError> {
        let builder = SourceBuilder::new(object)?;
        let builder_info = builder.info();
        let source = builder.build()?;
        let final_name = name.unwrap_or_else(|| builder_info.name());
        let final_description = description.unwrap_or_else(|| builder_info.description());
        Ok(self
            .register_source_instance(final_name, final_description, source)
            .await)
    }

    /// Register an object that is both declarative and a source itself
    ///
    /// Fails with `HybridWithoutRegistry` when the object declares metrics
    /// but carries no registry; the system is left untouched.
    pub async fn register_hybrid_source(
        &self,
        name: &str,
        description: &str,
        object: &mut dyn MetricsDecl,
        source: Arc<dyn Source>,
    ) -> Result<String, MetricsError> {
        let source = SourceBuilder::with_source(object, source)?.build()?;
        Ok(self
            .register_source_instance(name, description, source)
            .await)
    }

    /// Register a plain source object
    ///
    /// Returns the final name: registrations before monitoring starts get a
    /// distinct suffixed name when theirs is already taken (identically
    /// named components in one process stay apart), while a same-name
    /// registration on a monitoring system replaces the previous one. The
    /// registration outlives restarts: a named rebind callback re-creates
    /// the adapter at every post-start.
    pub async fn register_source_instance(
        &self,
        name: &str,
        description: &str,
        source: Arc<dyn Source>,
    ) -> String {
        let mut st = self.inner.state.lock().await;
        let final_name = default::source_name(name, !st.monitoring);
        // a same-name registration replaces the previous one
        st.all_sources.retain(|s| s.name != final_name);
        st.all_sources.push(RegisteredSource {
            name: final_name.clone(),
            description: description.to_string(),
            source,
        });
        tracing::debug!(source = %final_name, "registered source");
        if st.monitoring {
            self.bind_source_locked(&mut st, &final_name);
        }
        if !st
            .named_callbacks
            .iter()
            .any(|(n, rebind)| n == &final_name && matches!(rebind, Rebind::Source))
        {
            st.named_callbacks.push((final_name.clone(), Rebind::Source));
        }
        self.refresh_counts(&mut st);
        final_name
    }

    /// Register a sink under `name`
    ///
    /// A same-name registration replaces the previous sink, stopping its
    /// adapter. The sink is bound to an adapter immediately when
    /// configuration is loaded, and re-bound at every restart. Returns the
    /// shared handle the adapter delivers through.
    pub async fn register_sink(
        &self,
        name: &str,
        description: &str,
        sink: Box<dyn Sink>,
    ) -> SharedSink {
        let mut st = self.inner.state.lock().await;
        if st.all_sinks.iter().any(|s| s.name == name) {
            tracing::warn!(sink = %name, "sink already exists, replacing");
            st.all_sinks.retain(|s| s.name != name);
            if let Some(position) = st.sinks.iter().position(|(n, _)| n == name) {
                let (_, adapter) = st.sinks.remove(position);
                adapter.stop().await;
                self.inner.stats.sink_stats.lock().retain(|(n, _)| n != name);
            }
        }
        let shared: SharedSink = Arc::new(tokio::sync::Mutex::new(sink));
        st.all_sinks.push(RegisteredSink {
            name: name.to_string(),
            description: description.to_string(),
            sink: Arc::clone(&shared),
        });
        if st.configured {
            self.bind_sink_locked(&mut st, name);
        }
        if !st
            .named_callbacks
            .iter()
            .any(|(n, rebind)| n == name && matches!(rebind, Rebind::Sink))
        {
            st.named_callbacks.push((name.to_string(), Rebind::Sink));
        }
        self.refresh_counts(&mut st);
        tracing::info!(sink = %name, "registered sink");
        shared
    }

    /// Register an unnamed lifecycle callback
    pub async fn register_callback(&self, callback: Arc<dyn Callback>) {
        self.inner
            .state
            .lock()
            .await
            .callbacks
            .push(GuardedCallback::new(callback));
    }

    /// Stop and remove the source registered under `name`
    pub async fn unregister_source(&self, name: &str) {
        let mut st = self.inner.state.lock().await;
        if let Some(position) = st.sources.iter().position(|(n, _)| n == name) {
            let (_, adapter) = st.sources.remove(position);
            adapter.stop();
        }
        st.all_sources.retain(|s| s.name != name);
        st.named_callbacks
            .retain(|(n, rebind)| !(n == name && matches!(rebind, Rebind::Source)));
        self.refresh_counts(&mut st);
        tracing::debug!(source = %name, "unregistered source");
    }

    /// Sample and publish immediately, waiting boundedly for queue space
    pub async fn publish_metrics_now(&self) {
        let mut st = self.inner.state.lock().await;
        if st.sinks.is_empty() {
            return;
        }
        let buffer = self.sample_locked(&mut st);
        self.publish_locked(&mut st, buffer, true).await;
    }

    /// Whether the timer loop is running
    pub async fn is_monitoring(&self) -> bool {
        self.inner.state.lock().await.monitoring
    }

    /// The computed base sampling period
    pub async fn period(&self) -> Duration {
        self.inner.state.lock().await.period
    }

    /// The source registered under `name`, if any
    pub async fn source(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.inner
            .state
            .lock()
            .await
            .all_sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| Arc::clone(&s.source))
    }

    // ------------------------------------------------------------------
    // Lifecycle internals (all called with the state lock held)
    // ------------------------------------------------------------------

    async fn start_locked(&self, st: &mut SystemState) -> Result<(), ConfigError> {
        if st.monitoring {
            tracing::warn!(prefix = %st.prefix, "metrics system already started");
            return Ok(());
        }
        let callbacks = st.callbacks.clone();
        for callback in &callbacks {
            callback.pre_start();
        }
        self.configure_locked(st)?;
        self.start_timer_locked(st);
        st.monitoring = true;
        tracing::info!(prefix = %st.prefix, period = ?st.period, "metrics system started");
        for callback in &callbacks {
            callback.post_start();
        }
        let named = st.named_callbacks.clone();
        for (name, rebind) in named {
            match rebind {
                Rebind::Source => self.bind_source_locked(st, &name),
                Rebind::Sink => self.bind_sink_locked(st, &name),
            }
        }
        self.refresh_counts(st);
        Ok(())
    }

    async fn stop_locked(&self, st: &mut SystemState) {
        if !st.monitoring && !default::in_mini_cluster_mode() {
            tracing::warn!(prefix = %st.prefix, "metrics system not yet started");
            return;
        }
        if !st.monitoring {
            tracing::info!(prefix = %st.prefix, "metrics system stopped (again)");
            return;
        }
        let callbacks = st.callbacks.clone();
        for callback in &callbacks {
            callback.pre_stop();
        }
        tracing::info!(prefix = %st.prefix, "stopping metrics system");
        self.stop_timer_locked(st);
        for (_, adapter) in st.sources.drain(..) {
            adapter.stop();
        }
        if let Some(sys_source) = st.sys_source.take() {
            sys_source.stop();
        }
        let sinks: Vec<(String, Arc<SinkAdapter>)> = st.sinks.drain(..).collect();
        for (_, adapter) in sinks {
            adapter.stop().await;
        }
        self.inner.stats.sink_stats.lock().clear();
        st.sink_configs.clear();
        st.source_configs.clear();
        st.injected_tags.clear();
        st.source_filter = None;
        st.configured = false;
        st.monitoring = false;
        self.refresh_counts(st);
        tracing::info!(prefix = %st.prefix, "metrics system stopped");
        for callback in &callbacks {
            callback.post_stop();
        }
    }

    fn configure_locked(&self, st: &mut SystemState) -> Result<(), ConfigError> {
        let config = st.supplied_config.clone();
        config.validate()?;
        st.sink_configs = config.sinks.clone();
        st.source_configs = config.sources.clone();
        st.source_filter = GlobFilter::from_spec(&config.source_filter)
            .map(|f| Arc::new(f) as Arc<dyn Filter>);

        // base tick = gcd of the sink periods, else the configured period
        let mut period_ms = 0u64;
        for sink in config.sinks.values() {
            let sink_period = sink.period.as_millis().max(1) as u64;
            period_ms = if period_ms == 0 {
                sink_period
            } else {
                gcd(period_ms, sink_period)
            };
        }
        st.period = if period_ms > 0 {
            Duration::from_millis(period_ms)
        } else {
            config.period
        };
        self.inner
            .period_ms
            .store(st.period.as_millis() as u64, Ordering::Relaxed);

        st.injected_tags = vec![tag(info("Hostname", "Local hostname"), &local_hostname())];
        st.configured = true;

        let sys_config = st
            .source_configs
            .get(SYSTEM_NAME)
            .cloned()
            .unwrap_or_default();
        let sys_source = Arc::new(SourceAdapter::new(
            SYSTEM_STATS_NAME,
            SYSTEM_STATS_DESC,
            Arc::new(SystemSource {
                stats: Arc::clone(&self.inner.stats),
            }) as Arc<dyn Source>,
            st.injected_tags.clone(),
            st.period,
            &sys_config,
        ));
        sys_source.start(&st.prefix);
        st.sys_source = Some(sys_source);
        Ok(())
    }

    fn start_timer_locked(&self, st: &mut SystemState) {
        if st.timer.is_some() {
            tracing::warn!(prefix = %st.prefix, "metrics system timer already started");
            return;
        }
        st.logical_time = 0;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let system = self.clone();
        let period = st.period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the immediate first tick; sampling starts one period in
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => system.on_timer_event().await,
                }
            }
        });
        st.timer = Some(TimerHandle { cancel, handle });
        tracing::info!(period = ?period, "scheduled metrics snapshot period");
    }

    fn stop_timer_locked(&self, st: &mut SystemState) {
        match st.timer.take() {
            Some(timer) => {
                timer.cancel.cancel();
                // the task only ever parks on the tick or the state lock,
                // so aborting here cannot interrupt a pass
                timer.handle.abort();
            }
            None => tracing::warn!(prefix = %st.prefix, "metrics system timer already stopped"),
        }
    }

    async fn on_timer_event(&self) {
        let mut st = self.inner.state.lock().await;
        if !st.monitoring {
            return;
        }
        st.logical_time += st.period.as_millis() as u64;
        if !st.sinks.is_empty() {
            let buffer = self.sample_locked(&mut st);
            self.publish_locked(&mut st, buffer, false).await;
        }
    }

    /// One sampling pass over every accepted source plus the self-source
    fn sample_locked(&self, st: &mut SystemState) -> Buffer {
        let mut builder = BufferBuilder::new();
        let adapters = st.sources.clone();
        for (name, adapter) in adapters {
            let accepted = st
                .source_filter
                .as_ref()
                .map_or(true, |f| f.accepts_name(&name));
            if accepted {
                self.snapshot_source(st, &mut builder, &name, &adapter);
            }
        }
        if let Some(sys_source) = st.sys_source.clone() {
            let name = sys_source.name().to_string();
            self.snapshot_source(st, &mut builder, &name, &sys_source);
        }
        builder.build()
    }

    fn snapshot_source(
        &self,
        st: &mut SystemState,
        builder: &mut BufferBuilder,
        name: &str,
        adapter: &Arc<SourceAdapter>,
    ) {
        let started = Instant::now();
        let records = adapter.get_metrics(&mut st.collector, true);
        builder.add(name, records);
        self.inner
            .stats
            .snapshot_stat
            .add(started.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(source = %name, "snapshotted source");
    }

    /// Fan a buffer out to every sink adapter
    async fn publish_locked(&self, st: &mut SystemState, buffer: Buffer, immediate: bool) {
        let mut dropped: i64 = 0;
        let sinks = st.sinks.clone();
        for (name, adapter) in sinks {
            let started = Instant::now();
            let accepted = if immediate {
                adapter.put_metrics_immediate(buffer.clone()).await
            } else {
                adapter.put_metrics(buffer.clone(), st.logical_time)
            };
            if !accepted {
                dropped += 1;
                tracing::debug!(sink = %name, "sink did not accept buffer");
            }
            self.inner
                .stats
                .publish_stat
                .add(started.elapsed().as_secs_f64() * 1_000.0);
        }
        self.inner.stats.dropped_pub_all.incr_by(dropped);
    }

    fn bind_source_locked(&self, st: &mut SystemState, name: &str) {
        let Some(entry) = st.all_sources.iter().find(|s| s.name == name) else {
            tracing::warn!(source = %name, "cannot bind unknown source");
            return;
        };
        let description = entry.description.clone();
        let source = Arc::clone(&entry.source);
        let config = st.source_configs.get(name).cloned().unwrap_or_else(|| {
            // sources without their own section inherit the system defaults
            SourceConfig {
                record_filter: st.supplied_config.record_filter.clone(),
                metric_filter: st.supplied_config.metric_filter.clone(),
            }
        });
        let adapter = Arc::new(SourceAdapter::new(
            name,
            description,
            source,
            st.injected_tags.clone(),
            st.period,
            &config,
        ));
        adapter.start(&st.prefix);
        if let Some(position) = st.sources.iter().position(|(n, _)| n == name) {
            st.sources[position].1.stop();
            st.sources[position] = (name.to_string(), adapter);
        } else {
            st.sources.push((name.to_string(), adapter));
        }
        self.refresh_counts(st);
        tracing::debug!(source = %name, "bound source adapter");
    }

    fn bind_sink_locked(&self, st: &mut SystemState, name: &str) {
        let Some(entry) = st.all_sinks.iter().find(|s| s.name == name) else {
            tracing::warn!(sink = %name, "cannot bind unknown sink");
            return;
        };
        if st.sinks.iter().any(|(n, _)| n == name) {
            tracing::warn!(sink = %name, "sink adapter already bound");
            return;
        }
        let config = st.sink_configs.get(name).cloned().unwrap_or_else(|| {
            // sinks without their own section publish on every base tick
            SinkConfig {
                period: st.period,
                ..Default::default()
            }
        });
        let adapter = Arc::new(SinkAdapter::new(
            name,
            entry.description.clone(),
            Arc::clone(&entry.sink),
            config,
        ));
        adapter.start();
        self.inner
            .stats
            .sink_stats
            .lock()
            .push((name.to_string(), adapter.stats()));
        st.sinks.push((name.to_string(), adapter));
        self.refresh_counts(st);
        tracing::debug!(sink = %name, "bound sink adapter");
    }

    fn register_control_bean(&self, st: &mut SystemState) {
        if st.control_bean.is_none() {
            let bean = format!("{}:name={}", st.prefix, SYSTEM_CONTROL_NAME);
            beans::register(
                bean.clone(),
                Arc::new(ControlBean {
                    period_ms: Arc::clone(&self.inner.period_ms),
                }),
            );
            st.control_bean = Some(bean);
        }
    }

    fn refresh_counts(&self, st: &mut SystemState) {
        let stats = &self.inner.stats;
        stats
            .num_active_sources
            .store(st.sources.len(), Ordering::Relaxed);
        stats
            .num_all_sources
            .store(st.all_sources.len(), Ordering::Relaxed);
        stats
            .num_active_sinks
            .store(st.sinks.len(), Ordering::Relaxed);
        stats
            .num_all_sinks
            .store(st.all_sinks.len(), Ordering::Relaxed);
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    a
}

fn local_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(error) => {
            tracing::error!(%error, "error getting localhost name, using 'localhost'");
            "localhost".to_string()
        }
    }
}
