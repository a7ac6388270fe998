//! Exposition tests for the scheduler histograms.

use std::sync::Arc;
use std::thread;

use warpgrid_metrics::*;

#[test]
fn scheduler_metrics_render_both_families() {
    let metrics = SchedulerMetrics::new();
    metrics
        .framework_extension_point_duration
        .with_label_values(&["Score", "Success"])
        .unwrap()
        .observe(0.0003);
    metrics
        .plugin_execution_duration
        .with_label_values(&["spread", "Score", "Error"])
        .unwrap()
        .observe(0.00002);

    let text = metrics.render();
    assert!(text.contains("# TYPE scheduler_framework_extension_point_duration_seconds histogram"));
    assert!(text.contains("# TYPE scheduler_plugin_execution_duration_seconds histogram"));
    assert!(text.contains(
        "scheduler_framework_extension_point_duration_seconds_count{extension_point=\"Score\",status=\"Success\"} 1"
    ));
    assert!(text.contains(
        "scheduler_plugin_execution_duration_seconds_bucket{plugin=\"spread\",extension_point=\"Score\",status=\"Error\",le=\"+Inf\"} 1"
    ));
}

#[test]
fn scheduler_bucket_layout() {
    let metrics = SchedulerMetrics::new();
    let phases = metrics.framework_extension_point_duration.buckets();
    assert_eq!(phases.len(), 12);
    assert!((phases[0] - 0.0001).abs() < 1e-12);
    assert!((phases[11] - 0.2048).abs() < 1e-9);

    let plugins = metrics.plugin_execution_duration.buckets();
    assert_eq!(plugins.len(), 20);
    assert!((plugins[0] - 0.00001).abs() < 1e-15);
}

#[test]
fn label_mismatch_is_rejected() {
    let metrics = SchedulerMetrics::new();
    let err = metrics
        .plugin_execution_duration
        .with_label_values(&["Score", "Success"])
        .unwrap_err();
    assert_eq!(
        err,
        MetricsError::LabelCardinality {
            metric: "scheduler_plugin_execution_duration_seconds".to_string(),
            expected: 3,
            got: 2,
        }
    );
}

#[test]
fn concurrent_observers_are_all_counted() {
    let vec = Arc::new(HistogramVec::new(HistogramOpts::new(
        "cycle_seconds",
        "Cycle durations.",
        &["worker"],
        exponential_buckets(0.001, 10.0, 4),
    )));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let vec = vec.clone();
            thread::spawn(move || {
                let worker = format!("w{}", i % 2);
                for _ in 0..250 {
                    vec.with_label_values(&[worker.as_str()]).unwrap().observe(0.01);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(vec.total_count(), 1000);
    assert_eq!(vec.sample_count(&["w0"]), 500);
    assert_eq!(vec.snapshot().len(), 2);
}
