//! Prometheus text exposition format.
//!
//! Renders histogram vectors into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use crate::histogram::HistogramVec;

/// Render histogram vectors into Prometheus text format.
///
/// Each vector produces a HELP/TYPE header followed by `_bucket`, `_sum`
/// and `_count` lines for every series.
pub fn render_prometheus(vecs: &[&HistogramVec]) -> String {
    let mut out = String::new();

    for vec in vecs {
        let name = vec.name();
        out.push_str(&format!("# HELP {} {}\n", name, vec.help()));
        out.push_str(&format!("# TYPE {} histogram\n", name));

        for series in vec.snapshot() {
            let labels: Vec<String> = vec
                .label_names()
                .iter()
                .zip(&series.label_values)
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect();

            let bounds = vec
                .buckets()
                .iter()
                .map(|b| b.to_string())
                .chain(std::iter::once("+Inf".to_string()));
            for (le, count) in bounds.zip(&series.cumulative_counts) {
                out.push_str(&format!(
                    "{}_bucket{{{}}} {}\n",
                    name,
                    join_labels(&labels, Some(&le)),
                    count
                ));
            }

            let plain = join_labels(&labels, None);
            out.push_str(&format!("{}_sum{{{}}} {}\n", name, plain, series.sum));
            out.push_str(&format!("{}_count{{{}}} {}\n", name, plain, series.count));
        }
    }

    out
}

fn join_labels(labels: &[String], le: Option<&str>) -> String {
    let mut parts = labels.to_vec();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    parts.join(",")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
