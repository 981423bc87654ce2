//! The exporter's instrument set.
//!
//! Every instrument is created and registered once in [`PumaMetrics::new`];
//! membership never changes afterwards. Values are updated through the
//! gauges' own atomic `set`, so readers never need a lock.

use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

use puma_core::{GC_COUNTER_COUNT, GcStats};

/// Label carried by every per-worker gauge.
pub const WORKER_LABEL: &str = "index";

/// Help text for a `puma_gc_*` gauge. Past the run counts it is just the name.
fn gc_help(key: &str) -> String {
    match key {
        "count" => "Number of all (minor+major) GC runs".to_string(),
        "minor_gc_count" => "Number of minor GC runs".to_string(),
        "major_gc_count" => "Number of major GC runs".to_string(),
        other => format!("puma_gc_{other}"),
    }
}

/// Gauges and gauge vectors published on `/metrics`.
///
/// Shared between the refresher (sole writer) and scrape handlers
/// (readers), normally behind an `Arc`.
pub struct PumaMetrics {
    registry: Registry,

    // Single mode
    pub(crate) request_backlog: Gauge,
    pub(crate) thread_count: Gauge,

    // Cluster mode
    pub(crate) workers: Gauge,
    pub(crate) booted_workers: Gauge,
    pub(crate) old_workers: Gauge,
    pub(crate) backlog: GaugeVec,
    pub(crate) running: GaugeVec,
    pub(crate) pool_capacity: GaugeVec,
    pub(crate) max_threads: GaugeVec,
    pub(crate) requests_count: GaugeVec,

    /// Same order as [`GcStats::counters`].
    pub(crate) gc: Vec<Gauge>,
}

impl PumaMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let gauge = |name: &str, help: &str| -> prometheus::Result<Gauge> {
            let g = Gauge::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };
        let per_worker = |name: &str, help: &str| -> prometheus::Result<GaugeVec> {
            let v = GaugeVec::new(Opts::new(name, help), &[WORKER_LABEL])?;
            registry.register(Box::new(v.clone()))?;
            Ok(v)
        };

        let request_backlog = gauge(
            "puma_request_backlog",
            "Number of requests waiting to be processed by a thread",
        )?;
        let thread_count = gauge("puma_thread_count", "Number of threads currently running")?;

        let workers = gauge("puma_workers", "Number of configured workers")?;
        let booted_workers = gauge("puma_booted_workers", "Number of booted workers")?;
        let old_workers = gauge(
            "puma_old_workers",
            "Number of workers running a previous phase",
        )?;
        let backlog = per_worker(
            "puma_backlog",
            "Number of requests waiting to be processed by a thread",
        )?;
        let running = per_worker("puma_running", "Number of threads currently running")?;
        let pool_capacity = per_worker(
            "puma_pool_capacity",
            "Number of threads available to take requests",
        )?;
        let max_threads = per_worker("puma_max_threads", "Maximum number of threads")?;
        let requests_count = per_worker(
            "puma_requests_count",
            "Number of requests processed by the worker",
        )?;

        let mut gc = Vec::with_capacity(GC_COUNTER_COUNT);
        for (key, _) in GcStats::default().counters() {
            gc.push(gauge(&format!("puma_gc_{key}"), &gc_help(key))?);
        }

        Ok(Self {
            registry,
            request_backlog,
            thread_count,
            workers,
            booted_workers,
            old_workers,
            backlog,
            running,
            pool_capacity,
            max_threads,
            requests_count,
            gc,
        })
    }

    /// Current metric families, sorted by name.
    ///
    /// Gauge vectors with no series yet are omitted.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Read one value without creating anything.
    ///
    /// `index` selects a per-worker series; `None` reads an unlabeled gauge.
    pub fn value(&self, name: &str, index: Option<usize>) -> Option<f64> {
        let wanted = index.map(|i| i.to_string());
        let families = self.gather();
        let family = families.iter().find(|mf| mf.get_name() == name)?;
        let series = family.get_metric().iter().find(|m| {
            let label = m
                .get_label()
                .iter()
                .find(|l| l.get_name() == WORKER_LABEL)
                .map(|l| l.get_value());
            label == wanted.as_deref()
        })?;
        Some(series.get_gauge().get_value())
    }

    /// Number of series currently held by `name`.
    pub fn series_count(&self, name: &str) -> usize {
        self.gather()
            .iter()
            .find(|mf| mf.get_name() == name)
            .map(|mf| mf.get_metric().len())
            .unwrap_or(0)
    }
}
