//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, outer request timeout)
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::http::handlers;
use crate::rate_limiter::RateLimiter;

/// Outer safety-net timeout. The dispatcher enforces its own 10s deadline
/// per selection; this bound only covers the failover worst case.
const SERVER_TIMEOUT: Duration = Duration::from_secs(45);

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the admission pipeline.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::admit_and_forward))
            .route(
                "/clients",
                post(handlers::add_client).put(handlers::update_client),
            )
            .route("/clients/{client_id}", delete(handlers::delete_client))
            .with_state(state)
            .layer(TimeoutLayer::new(SERVER_TIMEOUT))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
