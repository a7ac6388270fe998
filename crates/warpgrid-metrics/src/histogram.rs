//! Labelled histogram vectors.
//!
//! A `HistogramVec` owns one series per distinct tuple of label values.
//! Series are created lazily on first observation. Bucket bounds are
//! fixed at construction and shared by every series of the vector.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{MetricsError, MetricsResult};

/// Static description of a histogram vector.
#[derive(Debug, Clone)]
pub struct HistogramOpts {
    /// Fully qualified metric name.
    pub name: String,
    /// Help text for the exposition format.
    pub help: String,
    /// Label names, in the order label values are supplied.
    pub label_names: Vec<String>,
    /// Upper bounds of the buckets, ascending. `+Inf` is implicit.
    pub buckets: Vec<f64>,
}

impl HistogramOpts {
    pub fn new(name: &str, help: &str, label_names: &[&str], buckets: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            buckets,
        }
    }
}

/// Per-series accumulator.
#[derive(Debug, Clone)]
struct Series {
    /// Non-cumulative count per bucket; the last slot is `+Inf`.
    bucket_counts: Vec<u64>,
    count: u64,
    sum: f64,
}

impl Series {
    fn new(bucket_len: usize) -> Self {
        Self {
            bucket_counts: vec![0; bucket_len + 1],
            count: 0,
            sum: 0.0,
        }
    }
}

/// Point-in-time copy of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub label_values: Vec<String>,
    /// Cumulative counts aligned with the vector's buckets, followed by `+Inf`.
    pub cumulative_counts: Vec<u64>,
    pub count: u64,
    pub sum: f64,
}

/// A histogram partitioned by label values.
#[derive(Debug)]
pub struct HistogramVec {
    opts: HistogramOpts,
    series: Mutex<BTreeMap<Vec<String>, Series>>,
}

impl HistogramVec {
    /// Create an empty vector. Buckets are sorted and deduplicated.
    pub fn new(mut opts: HistogramOpts) -> Self {
        opts.buckets.retain(|b| b.is_finite());
        opts.buckets.sort_by(|a, b| a.total_cmp(b));
        opts.buckets.dedup();
        Self {
            opts,
            series: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.opts.name
    }

    pub fn help(&self) -> &str {
        &self.opts.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.opts.label_names
    }

    pub fn buckets(&self) -> &[f64] {
        &self.opts.buckets
    }

    /// Address the series for the given label values.
    pub fn with_label_values<S: AsRef<str>>(&self, values: &[S]) -> MetricsResult<Histogram<'_>> {
        if values.len() != self.opts.label_names.len() {
            return Err(MetricsError::LabelCardinality {
                metric: self.opts.name.clone(),
                expected: self.opts.label_names.len(),
                got: values.len(),
            });
        }
        Ok(Histogram {
            vec: self,
            key: values.iter().map(|v| v.as_ref().to_string()).collect(),
        })
    }

    /// Number of samples observed for a series (0 if it does not exist).
    pub fn sample_count<S: AsRef<str>>(&self, values: &[S]) -> u64 {
        let key: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.get(&key).map(|s| s.count).unwrap_or(0)
    }

    /// Total samples across every series.
    pub fn total_count(&self) -> u64 {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.values().map(|s| s.count).sum()
    }

    /// Copy out every series, ordered by label values.
    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series
            .iter()
            .map(|(labels, s)| {
                let mut running = 0;
                let cumulative_counts = s
                    .bucket_counts
                    .iter()
                    .map(|c| {
                        running += c;
                        running
                    })
                    .collect();
                SeriesSnapshot {
                    label_values: labels.clone(),
                    cumulative_counts,
                    count: s.count,
                    sum: s.sum,
                }
            })
            .collect()
    }

    /// Drop every series.
    pub fn reset(&self) {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn observe_series(&self, key: &[String], value: f64) {
        let idx = self
            .opts
            .buckets
            .iter()
            .position(|upper| value <= *upper)
            .unwrap_or(self.opts.buckets.len());

        let bucket_len = self.opts.buckets.len();
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        let s = series
            .entry(key.to_vec())
            .or_insert_with(|| Series::new(bucket_len));
        s.bucket_counts[idx] += 1;
        s.count += 1;
        s.sum += value;
    }
}

/// Handle to a single series of a `HistogramVec`.
#[derive(Debug)]
pub struct Histogram<'a> {
    vec: &'a HistogramVec,
    key: Vec<String>,
}

impl Histogram<'_> {
    /// Record one sample.
    pub fn observe(&self, value: f64) {
        self.vec.observe_series(&self.key, value);
    }
}

/// `count` buckets where the first upper bound is `start` and each
/// following bound is `factor` times the previous one.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    let mut buckets = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        buckets.push(next);
        next *= factor;
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vec() -> HistogramVec {
        HistogramVec::new(HistogramOpts::new(
            "test_duration_seconds",
            "Test durations.",
            &["phase", "status"],
            vec![0.1, 1.0, 10.0],
        ))
    }

    #[test]
    fn exponential_buckets_grow_by_factor() {
        let buckets = exponential_buckets(0.5, 2.0, 4);
        assert_eq!(buckets, vec![0.5, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn exponential_buckets_zero_count() {
        assert!(exponential_buckets(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn observe_creates_series_lazily() {
        let vec = test_vec();
        assert!(vec.snapshot().is_empty());

        vec.with_label_values(&["Score", "Success"]).unwrap().observe(0.5);
        assert_eq!(vec.sample_count(&["Score", "Success"]), 1);
        assert_eq!(vec.sample_count(&["Score", "Error"]), 0);
    }

    #[test]
    fn label_cardinality_is_checked() {
        let vec = test_vec();
        let err = vec.with_label_values(&["Score"]).unwrap_err();
        assert_eq!(
            err,
            MetricsError::LabelCardinality {
                metric: "test_duration_seconds".to_string(),
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn buckets_are_cumulative_in_snapshot() {
        let vec = test_vec();
        let h = vec.with_label_values(&["Score", "Success"]).unwrap();
        h.observe(0.05); // <= 0.1
        h.observe(0.5); // <= 1.0
        h.observe(0.7); // <= 1.0
        h.observe(50.0); // +Inf

        let snap = vec.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].cumulative_counts, vec![1, 3, 3, 4]);
        assert_eq!(snap[0].count, 4);
        assert!((snap[0].sum - 51.25).abs() < 1e-9);
    }

    #[test]
    fn boundary_value_lands_in_its_bucket() {
        let vec = test_vec();
        vec.with_label_values(&["a", "b"]).unwrap().observe(1.0);
        let snap = vec.snapshot();
        assert_eq!(snap[0].cumulative_counts, vec![0, 1, 1, 1]);
    }

    #[test]
    fn unsorted_buckets_are_normalized() {
        let vec = HistogramVec::new(HistogramOpts::new(
            "x",
            "x",
            &[],
            vec![10.0, 1.0, 1.0, f64::INFINITY],
        ));
        assert_eq!(vec.buckets(), &[1.0, 10.0]);
    }

    #[test]
    fn total_count_spans_series() {
        let vec = test_vec();
        vec.with_label_values(&["a", "x"]).unwrap().observe(1.0);
        vec.with_label_values(&["b", "x"]).unwrap().observe(1.0);
        vec.with_label_values(&["b", "x"]).unwrap().observe(1.0);
        assert_eq!(vec.total_count(), 3);

        vec.reset();
        assert_eq!(vec.total_count(), 0);
    }
}
