// src/health/checker.rs
use super::probe::probe;
use crate::config::HealthCheckConfig;
use crate::metrics::MetricsCollector;
use crate::proxy::{Backend, BackendPool};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodically probes every backend and writes the result into its
/// liveness flag. Talks to the rest of the system only through those flags.
pub struct HealthChecker {
    config: HealthCheckConfig,
    pool: BackendPool,
    metrics: Option<Arc<MetricsCollector>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub healthy: usize,
    pub unhealthy: usize,
}

impl HealthChecker {
    pub fn new(
        config: HealthCheckConfig,
        pool: BackendPool,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            pool,
            metrics,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Runs until [`shutdown`](Self::shutdown) is called. The first round
    /// fires one full interval after start.
    pub async fn start(self: Arc<Self>) {
        let period = self.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!("Starting health checker with interval: {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all_backends().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Health checker shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// One round: probe each backend once, in registration order.
    pub async fn check_all_backends(&self) -> HealthReport {
        info!("Starting health check");

        let mut report = HealthReport {
            healthy: 0,
            unhealthy: 0,
        };
        for backend in self.pool.all_backends() {
            if self.check_backend(backend).await {
                report.healthy += 1;
            } else {
                report.unhealthy += 1;
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_health_check(report.healthy, self.pool.len());
        }

        info!(
            "Health check completed: {} healthy, {} unhealthy",
            report.healthy, report.unhealthy
        );
        report
    }

    async fn check_backend(&self, backend: &Backend) -> bool {
        let alive = match probe(backend.probe_address(), self.config.timeout()).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Backend unreachable: {}", e);
                false
            }
        };

        let was_alive = backend.set_alive(alive).await;
        if let Some(metrics) = &self.metrics {
            metrics.update_backend_health(&backend.id, alive);
        }

        match (was_alive, alive) {
            (false, true) => info!("Backend {} is back up", backend.id),
            (true, false) => warn!("Backend {} is down", backend.id),
            _ => {}
        }
        alive
    }
}
