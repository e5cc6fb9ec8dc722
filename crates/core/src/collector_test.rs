//! Collector and record builder tests

use std::sync::Arc;

use super::*;
use crate::filter::GlobFilter;
use crate::metric::MetricKind;

#[test]
fn test_single_record_round_trip() {
    let mut collector = Collector::new();
    collector
        .add_record(info("Rpc", "Rpc metrics"))
        .set_context("rpc")
        .add_counter(info("Calls", "Total calls"), 7)
        .add_gauge_double(info("AvgTime", "Average call time"), 1.5);

    let records = collector.get_records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.name(), "Rpc");
    assert_eq!(record.context(), Some("rpc"));
    assert_eq!(record.metrics().len(), 2);
    assert_eq!(record.metrics()[0].kind(), MetricKind::Counter);
    assert!(record.timestamp() > 0);
}

#[test]
fn test_add_record_named_synthesizes_description() {
    let mut collector = Collector::new();
    collector.add_record_named("JvmMetrics");
    let records = collector.get_records();
    assert_eq!(records[0].description(), "JvmMetrics record");
}

#[test]
fn test_records_preserve_insertion_order() {
    let mut collector = Collector::new();
    collector.add_record_named("first");
    collector.add_record_named("second");
    let names: Vec<String> = collector
        .get_records()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_clear_discards_builders() {
    let mut collector = Collector::new();
    collector.add_record_named("stale");
    collector.clear();
    assert!(collector.is_empty());
    assert!(collector.get_records().is_empty());
}

#[test]
fn test_rejected_record_builder_is_a_no_op() {
    let mut collector = Collector::new();
    collector.set_record_filter(Some(Arc::new(GlobFilter::new(&["good*"], &[]))));

    // source code writes into the rejected builder without branching
    collector
        .add_record_named("bad")
        .set_context("x")
        .add_counter(info("Calls", "calls"), 1);
    collector.add_record_named("good1").add_counter(info("Calls", "calls"), 2);

    let records = collector.get_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), "good1");
}

#[test]
fn test_metric_filter_drops_rejected_metrics() {
    let mut collector = Collector::new();
    collector.set_metric_filter(Some(Arc::new(GlobFilter::new::<&str>(&[], &["Noisy*"]))));

    collector
        .add_record_named("r")
        .add_counter(info("NoisyCalls", "noise"), 1)
        .add_counter(info("Calls", "calls"), 2);

    let records = collector.get_records();
    assert_eq!(records[0].metrics().len(), 1);
    assert_eq!(records[0].metrics()[0].name(), "Calls");
}

#[test]
fn test_record_filter_on_tags() {
    let mut collector = Collector::new();
    collector.set_record_filter(Some(Arc::new(GlobFilter::new::<&str>(
        &[],
        &["Context:noisy"],
    ))));

    collector.add_record_named("quiet").set_context("calm");
    collector.add_record_named("loud").set_context("noisy");

    let records = collector.get_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), "quiet");
}

#[test]
fn test_add_metric_bypasses_filter() {
    let mut collector = Collector::new();
    collector.set_metric_filter(Some(Arc::new(GlobFilter::new::<&str>(&[], &["*"]))));

    collector.add_record_named("r").add_metric(AbstractMetric::new(
        info("Forced", "forced"),
        MetricValue::GaugeLong(1),
    ));

    let records = collector.get_records();
    assert_eq!(records[0].metrics().len(), 1);
}
