//! Background refresh loop.
//!
//! One [`Refresher`] per process is the only writer to [`PumaMetrics`].
//! Each tick polls the configured endpoints one after another; a failed
//! poll is logged and the loop waits for the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use puma_control::{ControlClient, redact};
use puma_core::{ExporterConfig, Mode, StatusKind, UpstreamStatus, decode};

use crate::error::PollError;
use crate::registry::PumaMetrics;
use crate::translate::translate;

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPlan {
    pub mode: Mode,
    pub gc_stats: bool,
    pub interval: Duration,
}

impl RefreshPlan {
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self {
            mode: config.mode,
            gc_stats: config.gc_stats,
            interval: config.interval,
        }
    }

    /// Endpoints polled on every tick, in order.
    pub fn endpoints(&self) -> Vec<StatusKind> {
        let mut kinds = vec![self.mode.stats_kind()];
        if self.gc_stats {
            kinds.push(StatusKind::GcStats);
        }
        kinds
    }
}

/// Outcome of one tick, per endpoint.
pub type PollReport = Vec<(StatusKind, Result<(), PollError>)>;

pub struct Refresher {
    client: ControlClient,
    metrics: Arc<PumaMetrics>,
    plan: RefreshPlan,
    stopped: AtomicBool,
}

impl Refresher {
    pub fn new(client: ControlClient, metrics: Arc<PumaMetrics>, plan: RefreshPlan) -> Self {
        Self {
            client,
            metrics,
            plan,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn plan(&self) -> &RefreshPlan {
        &self.plan
    }

    /// Stop applying updates. Polls already in flight are discarded.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Poll every planned endpoint once, sequentially.
    pub async fn poll_once(&self) -> PollReport {
        let mut report = Vec::with_capacity(2);
        for kind in self.plan.endpoints() {
            let result = self.poll(kind).await;
            match &result {
                Ok(()) => {}
                Err(PollError::Stopped { .. }) => {
                    debug!(%kind, "shutting down, poll result discarded");
                }
                Err(e) => warn!(
                    %kind,
                    url = %redact(&self.client.endpoint_url(kind)),
                    error = %e,
                    "poll failed"
                ),
            }
            report.push((kind, result));
        }
        report
    }

    async fn poll(&self, kind: StatusKind) -> Result<(), PollError> {
        let body = self
            .client
            .fetch_status(kind)
            .await
            .map_err(|source| PollError::Fetch { kind, source })?;
        let status = decode(&body, kind)?;

        if self.is_stopped() {
            return Err(PollError::Stopped { kind });
        }
        translate(&status, &self.metrics);

        match &status {
            UpstreamStatus::Cluster(cluster) => {
                debug!(%kind, workers = cluster.worker_status.len(), "metrics updated")
            }
            _ => debug!(%kind, "metrics updated"),
        }
        Ok(())
    }

    /// Poll on every tick until `shutdown` changes.
    ///
    /// The first poll happens immediately. A poll still running when
    /// shutdown arrives is dropped without touching the metrics.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            mode = %self.plan.mode,
            gc_stats = self.plan.gc_stats,
            interval_ms = self.plan.interval.as_millis() as u64,
            "refresher started"
        );

        if *shutdown.borrow() {
            self.stop();
            info!("refresher stopped");
            return;
        }

        let mut ticker = tokio::time::interval(self.plan.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = self.poll_once() => {}
            }
        }

        self.stop();
        info!("refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn refresher(plan: RefreshPlan) -> Refresher {
        let client = ControlClient::new(
            Url::parse("http://127.0.0.1:7353").unwrap(),
            "",
            Duration::from_secs(1),
        );
        Refresher::new(client, Arc::new(PumaMetrics::new().unwrap()), plan)
    }

    #[test]
    fn plan_from_defaults_polls_stats_then_gc() {
        let plan = RefreshPlan::from_config(&ExporterConfig::default());
        assert_eq!(plan.interval, Duration::from_secs(5));
        assert_eq!(
            plan.endpoints(),
            vec![StatusKind::Stats, StatusKind::GcStats]
        );
    }

    #[test]
    fn cluster_plan_without_gc() {
        let plan = RefreshPlan {
            mode: Mode::Cluster,
            gc_stats: false,
            interval: Duration::from_secs(1),
        };
        assert_eq!(plan.endpoints(), vec![StatusKind::ClusterStats]);
    }

    #[test]
    fn stop_is_sticky() {
        let r = refresher(RefreshPlan::from_config(&ExporterConfig::default()));
        assert!(!r.is_stopped());
        r.stop();
        r.stop();
        assert!(r.is_stopped());
    }

    #[tokio::test]
    async fn run_returns_at_once_if_already_shut_down() {
        let r = refresher(RefreshPlan::from_config(&ExporterConfig::default()));
        let (_tx, rx) = watch::channel(true);
        tokio::time::timeout(Duration::from_secs(1), r.run(rx))
            .await
            .unwrap();
        assert!(r.is_stopped());
    }
}
