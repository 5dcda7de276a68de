//! Rate-limiting reverse proxy.
//!
//! Startup order matters: client quotas load from the durable store before
//! the listener binds, so no admission check ever runs against an empty
//! bucket set.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatewarden::config::{AppConfig, Cli};
use gatewarden::http::{AppState, HttpServer};
use gatewarden::store::SqlClientStore;
use gatewarden::{Backend, BackendPool, Dispatcher, HealthChecker, RateLimiter, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatewarden=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("gatewarden v0.1.0 starting");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let port = config.resolve_port(cli.port);

    // Backend pool from the static CLI list.
    let pool = Arc::new(BackendPool::new());
    for url in &cli.backends {
        tracing::info!(backend = %url, "Registering backend");
        pool.add(Arc::new(Backend::new(url.clone())));
    }

    if let Some(addr) = cli.metrics_address {
        gatewarden::observability::metrics::init_metrics(addr);
    }

    // Quotas must be loaded before serving; a store failure here is fatal.
    let store = Arc::new(SqlClientStore::connect(&config.database_url).await?);
    let limiter = Arc::new(RateLimiter::new(store).await?);
    let refill_loop = limiter.spawn_refill();

    let shutdown = Shutdown::new();
    let checker = HealthChecker::new(pool.clone());
    tokio::spawn(checker.run(shutdown.subscribe()));

    let state = AppState {
        limiter: limiter.clone(),
        dispatcher: Arc::new(Dispatcher::new(pool)),
    };

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port = port, "Listening for connections");

    let server = HttpServer::new(state);
    let server_shutdown = shutdown.subscribe();

    tokio::select! {
        result = server.run(listener, server_shutdown) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    shutdown.trigger();
    limiter.stop();
    let _ = refill_loop.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
