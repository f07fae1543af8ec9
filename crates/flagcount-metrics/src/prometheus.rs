//! Prometheus text exposition format.
//!
//! Renders a [`MetricSnapshot`] into the text exposition format for
//! scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::metric::{Counter, Gauge, GaugeFamily, Histogram};
use crate::store::MetricSnapshot;

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a snapshot into Prometheus text format.
///
/// Every registered metric gets its `# HELP` and `# TYPE` lines, even when
/// a labeled family has no series yet.
pub fn render_prometheus(snapshot: &MetricSnapshot) -> String {
    let mut out = String::new();
    let ns = &snapshot.namespace;

    for gauge in Gauge::ALL {
        let name = full_name(ns, gauge.name());
        header(&mut out, &name, gauge.help(), "gauge");
        let _ = writeln!(out, "{name} {}", format_value(snapshot.scalar(gauge)));
    }

    for counter in Counter::ALL {
        let name = full_name(ns, counter.name());
        header(&mut out, &name, counter.help(), "counter");
        let _ = writeln!(out, "{name} {}", snapshot.counter(counter));
    }

    for family in GaugeFamily::ALL {
        let name = full_name(ns, family.name());
        header(&mut out, &name, family.help(), "gauge");
        let Some(series) = snapshot.families.get(&family) else {
            continue;
        };
        for (labels, value) in series {
            let pairs: Vec<String> = family
                .label_names()
                .iter()
                .zip(labels.values())
                .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
                .collect();
            let _ = writeln!(out, "{name}{{{}}} {}", pairs.join(","), format_value(*value));
        }
    }

    for histogram in Histogram::ALL {
        let name = full_name(ns, histogram.name());
        header(&mut out, &name, histogram.help(), "histogram");
        let Some(h) = snapshot.histogram(histogram) else {
            continue;
        };
        for (bound, count) in h.bounds.iter().zip(h.cumulative()) {
            let _ = writeln!(out, "{name}_bucket{{le=\"{}\"}} {count}", format_value(*bound));
        }
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {}", h.count);
        let _ = writeln!(out, "{name}_sum {}", format_value(h.sum));
        let _ = writeln!(out, "{name}_count {}", h.count);
    }

    out
}

fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}_{name}")
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

/// Escape `\`, `"` and newlines in a label value.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // f64 Display already prints integral values without a fraction.
        value.to_string()
    }
}
