//! Prometheus text exposition format.

use prometheus::{Encoder, TextEncoder};

use crate::registry::PumaMetrics;

/// Content type of [`render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render the current value of every instrument in text format.
pub fn render(metrics: &PumaMetrics) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::translate;
    use puma_core::{StatusKind, decode};

    #[test]
    fn renders_help_type_and_value() {
        let metrics = PumaMetrics::new().unwrap();
        translate(
            &decode(br#"{"running": 4, "backlog": 2}"#, StatusKind::Stats).unwrap(),
            &metrics,
        );
        let text = render(&metrics).unwrap();

        assert!(text.contains(
            "# HELP puma_thread_count Number of threads currently running\n"
        ));
        assert!(text.contains("# TYPE puma_thread_count gauge\n"));
        assert!(text.contains("puma_thread_count 4\n"));
        assert!(text.contains("puma_request_backlog 2\n"));
    }

    #[test]
    fn renders_worker_labels() {
        let metrics = PumaMetrics::new().unwrap();
        let doc = br#"{"workers": 2, "worker_status": [
            {"last_status": {"backlog": 5}},
            {"last_status": {"backlog": 9}}
        ]}"#;
        translate(&decode(doc, StatusKind::ClusterStats).unwrap(), &metrics);
        let text = render(&metrics).unwrap();

        assert!(text.contains("puma_backlog{index=\"0\"} 5\n"));
        assert!(text.contains("puma_backlog{index=\"1\"} 9\n"));
        assert!(text.contains("puma_workers 2\n"));
    }

    #[test]
    fn only_puma_metrics_are_exposed() {
        let metrics = PumaMetrics::new().unwrap();
        let text = render(&metrics).unwrap();
        for line in text.lines().filter(|l| !l.starts_with('#')) {
            assert!(line.starts_with("puma_"), "unexpected series: {line}");
        }
    }
}
