//! Registry tests

use super::*;
use crate::collector::Collector;
use crate::info::info;

#[test]
fn test_create_and_get() {
    let registry = MetricsRegistry::new("TestSource");
    let counter = registry
        .new_counter(info("Requests", "Total requests"), 0)
        .unwrap();
    counter.incr();

    let fetched = registry.get("Requests").expect("metric is registered");
    assert_eq!(fetched.info().name(), "Requests");
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_name_rejected() {
    let registry = MetricsRegistry::new("TestSource");
    registry
        .new_counter(info("Requests", "Total requests"), 0)
        .unwrap();
    let err = registry
        .new_gauge(info("Requests", "something else"), 0)
        .unwrap_err();
    assert!(matches!(err, MetricsError::DuplicateName(ref n) if n == "Requests"));
    // the failed registration left the map untouched
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_snapshot_in_registration_order() {
    let registry = MetricsRegistry::new("TestSource");
    registry.new_counter(info("B", "b"), 1).unwrap();
    registry.new_gauge(info("A", "a"), 2).unwrap();
    registry
        .new_stat("Latency", "latency", "Ops", "Time", false)
        .unwrap();

    let mut collector = Collector::new();
    let rb = collector.add_record(registry.info());
    registry.snapshot(rb, true);

    let records = collector.get_records();
    let names: Vec<&str> = records[0].metrics().iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        vec!["B", "A", "LatencyNum", "LatencyAvg", "LatencyMin", "LatencyMax"]
    );
}

#[test]
fn test_context_tag_applied() {
    let registry = MetricsRegistry::new("TestSource");
    registry.set_context("dfs");
    registry.new_counter(info("Ops", "ops"), 0).unwrap();

    let mut collector = Collector::new();
    let rb = collector.add_record(registry.info());
    registry.snapshot(rb, true);

    let records = collector.get_records();
    assert_eq!(records[0].context(), Some("dfs"));
}

#[test]
fn test_handles_share_state_with_registry() {
    let registry = MetricsRegistry::new("TestSource");
    let counter = registry.new_counter(info("Ops", "ops"), 0).unwrap();
    let clone = registry.clone();

    counter.incr_by(5);

    let mut collector = Collector::new();
    let rb = collector.add_record(clone.info());
    clone.snapshot(rb, true);

    let records = collector.get_records();
    assert_eq!(format!("{:?}", records[0].metrics()[0]), "Ops=5");
}

#[test]
fn test_fn_gauge_registration() {
    let registry = MetricsRegistry::new("TestSource");
    registry
        .fn_gauge(info("Uptime", "uptime"), || MetricValue::GaugeLong(42))
        .unwrap();

    let mut collector = Collector::new();
    let rb = collector.add_record(registry.info());
    registry.snapshot(rb, false);

    let records = collector.get_records();
    assert_eq!(records[0].metrics()[0].value(), MetricValue::GaugeLong(42));
}
