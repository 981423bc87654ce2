//! Mapping decoded control app documents onto instruments.

use puma_core::{ClusterStats, GcStats, Stats, UpstreamStatus};

use crate::registry::PumaMetrics;

/// Write every field of `status` into its instrument.
///
/// Each gauge is replaced independently; a concurrent scrape may see
/// part of one poll's update. Applying the same document twice leaves
/// the same state.
pub fn translate(status: &UpstreamStatus, metrics: &PumaMetrics) {
    match status {
        UpstreamStatus::Stats(stats) => apply_stats(stats, metrics),
        UpstreamStatus::Cluster(cluster) => apply_cluster(cluster, metrics),
        UpstreamStatus::Gc(gc) => apply_gc(gc, metrics),
    }
}

fn apply_stats(stats: &Stats, metrics: &PumaMetrics) {
    metrics.request_backlog.set(stats.backlog as f64);
    metrics.thread_count.set(stats.running as f64);
}

fn apply_cluster(cluster: &ClusterStats, metrics: &PumaMetrics) {
    metrics.workers.set(cluster.workers as f64);
    metrics.booted_workers.set(cluster.booted_workers as f64);
    metrics.old_workers.set(cluster.old_workers as f64);

    // Position in the list is the label, not the worker's pid or its own
    // `index` field. Series for workers no longer listed are left as-is.
    for (position, worker) in cluster.worker_status.iter().enumerate() {
        let index = position.to_string();
        let labels = [index.as_str()];
        let last = &worker.last_status;
        metrics
            .backlog
            .with_label_values(&labels)
            .set(last.backlog as f64);
        metrics
            .running
            .with_label_values(&labels)
            .set(last.running as f64);
        metrics
            .pool_capacity
            .with_label_values(&labels)
            .set(last.pool_capacity as f64);
        metrics
            .max_threads
            .with_label_values(&labels)
            .set(last.max_threads as f64);
        metrics
            .requests_count
            .with_label_values(&labels)
            .set(last.requests_count as f64);
    }
}

fn apply_gc(gc: &GcStats, metrics: &PumaMetrics) {
    for ((_, value), gauge) in gc.counters().iter().zip(&metrics.gc) {
        gauge.set(*value as f64);
    }
}
