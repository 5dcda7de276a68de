//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's reachability
//! - Apply probe results to the pool's liveness flags
//!
//! # Design Decisions
//! - TCP connect is the probe; a backend that accepts a connection is live
//! - Probes within one tick run in parallel and are joined before the next
//! - No flap suppression: a backend oscillates with probe results, and a
//!   backend the dispatcher marked dead is revived by the next passing probe

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;

use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

/// Time between probe rounds.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(120);
/// Per-probe connect timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Periodic reachability prober for the backend pool.
pub struct HealthChecker {
    pool: Arc<BackendPool>,
    interval: Duration,
}

impl HealthChecker {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self {
            pool,
            interval: CHECK_INTERVAL,
        }
    }

    /// Override the probe interval (tests use a short one).
    pub fn with_interval(pool: Arc<BackendPool>, interval: Duration) -> Self {
        Self { pool, interval }
    }

    /// Run the probe loop until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Health checker starting");

        let mut ticker = time::interval(self.interval);
        // First tick fires immediately; skip it so startup liveness holds
        // until the first full interval has passed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting health check round");
                    self.check_all().await;
                    tracing::debug!("Health check round completed");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend in parallel and apply the results.
    pub async fn check_all(&self) {
        let probes = self
            .pool
            .all_backends()
            .into_iter()
            .map(|backend| async move {
                let alive = probe(&backend).await;
                backend.set_alive(alive);
                metrics::record_backend_health(backend.url.as_str(), alive);
                tracing::info!(
                    backend = %backend.url,
                    status = if alive { "up" } else { "down" },
                    "Backend probed"
                );
            });
        join_all(probes).await;
    }
}

/// TCP-connect reachability probe.
async fn probe(backend: &Arc<Backend>) -> bool {
    let Some(addr) = backend.probe_addr() else {
        return false;
    };
    matches!(
        time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}
