//! Request forwarding state machine.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → select live backend (attempt budget: 3 backends per request)
//!     → forward, racing a 10s deadline taken at selection
//!         transient error → 10ms backoff, retry same backend (up to 3)
//!         retries exhausted → mark backend dead, fail over to next
//!     → backend response | 503 (no backend / budget spent) | 504 (deadline)
//! ```
//!
//! # Design Decisions
//! - The forward runs on a spawned task raced against the deadline.
//!   Expiry is cooperative abandonment: the in-flight call is not aborted,
//!   its late result is discarded.
//! - The same-backend retry counter resets on failover; the attempts
//!   counter is request-scoped and does not.
//! - A dead mark is durable until the next health-check round revives the
//!   backend; there is no immediate self-healing path.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::HeaderValue;
use axum::http::{request, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time::{self, Instant};

use crate::error::Error;
use crate::load_balancer::{Backend, BackendPool};

/// Distinct backends tried per request before giving up.
pub const MAX_ATTEMPTS: u32 = 3;
/// Same-backend forwards after the first, per selection.
pub const MAX_RETRIES: u32 = 3;
/// Fixed delay between same-backend retries.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(10);
/// End-to-end deadline, measured from backend selection.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// Terminal result of forwarding to one selected backend.
enum BackendOutcome {
    /// The backend answered; its status code stands, whatever it is.
    Served(Response<Incoming>),
    /// Transient errors exhausted the retry budget.
    Exhausted,
}

/// Forwards admitted requests to the backend pool with bounded
/// retry and failover.
pub struct Dispatcher {
    pool: Arc<BackendPool>,
    client: Client<HttpConnector, Body>,
    deadline: Duration,
    backoff: Duration,
}

impl Dispatcher {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            pool,
            client,
            deadline: REQUEST_DEADLINE,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Override timing constants (tests shrink them).
    pub fn with_timing(pool: Arc<BackendPool>, deadline: Duration, backoff: Duration) -> Self {
        let mut dispatcher = Self::new(pool);
        dispatcher.deadline = deadline;
        dispatcher.backoff = backoff;
        dispatcher
    }

    /// Run the dispatch state machine for one admitted request.
    ///
    /// The body is pre-buffered by the caller so it can be replayed across
    /// retries and failovers.
    pub async fn dispatch(
        &self,
        parts: &request::Parts,
        body: Bytes,
        request_id: &str,
    ) -> Result<Response<Body>, Error> {
        let mut attempts: u32 = 1;
        loop {
            if attempts > MAX_ATTEMPTS {
                tracing::warn!(
                    request_id = %request_id,
                    path = %parts.uri.path(),
                    "Max attempts reached, terminating"
                );
                return Err(Error::ServiceUnavailable);
            }

            let Some(backend) = self.pool.select() else {
                tracing::warn!(request_id = %request_id, "No live backend available");
                return Err(Error::ServiceUnavailable);
            };

            let deadline = Instant::now() + self.deadline;
            match time::timeout_at(
                deadline,
                self.forward_to_backend(&backend, parts, &body, request_id),
            )
            .await
            {
                Ok(BackendOutcome::Served(response)) => {
                    return Ok(response.map(Body::new));
                }
                Ok(BackendOutcome::Exhausted) => {
                    tracing::warn!(
                        request_id = %request_id,
                        backend = %backend.url,
                        attempt = attempts,
                        "Marking backend dead, failing over"
                    );
                    self.pool.mark_status(&backend.url, false);
                    attempts += 1;
                }
                Err(_) => {
                    // The in-flight forward is left to finish on its own;
                    // whatever it produces is discarded.
                    tracing::error!(
                        request_id = %request_id,
                        backend = %backend.url,
                        "Request deadline exceeded, abandoning"
                    );
                    return Err(Error::DeadlineExceeded);
                }
            }
        }
    }

    /// Forward to one backend, retrying transient errors with a fixed
    /// backoff. Every forward runs on its own task so an expired deadline
    /// abandons rather than cancels it.
    async fn forward_to_backend(
        &self,
        backend: &Arc<Backend>,
        parts: &request::Parts,
        body: &Bytes,
        request_id: &str,
    ) -> BackendOutcome {
        for retry in 0..=MAX_RETRIES {
            let request = match self.build_forward_request(backend, parts, body, request_id) {
                Ok(request) => request,
                Err(err) => {
                    tracing::error!(
                        request_id = %request_id,
                        backend = %backend.url,
                        error = %err,
                        "Failed to build forward request"
                    );
                    return BackendOutcome::Exhausted;
                }
            };

            let forward = tokio::spawn(self.client.request(request));
            match forward.await {
                Ok(Ok(response)) => return BackendOutcome::Served(response),
                Ok(Err(err)) => {
                    tracing::warn!(
                        request_id = %request_id,
                        backend = %backend.url,
                        retry = retry,
                        error = %err,
                        "Backend forward failed"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        request_id = %request_id,
                        backend = %backend.url,
                        error = %err,
                        "Forward task failed"
                    );
                }
            }

            if retry < MAX_RETRIES {
                time::sleep(self.backoff).await;
            }
        }
        BackendOutcome::Exhausted
    }

    fn build_forward_request(
        &self,
        backend: &Arc<Backend>,
        parts: &request::Parts,
        body: &Bytes,
        request_id: &str,
    ) -> Result<Request<Body>, axum::http::Error> {
        let mut target = backend.url.clone();
        target.set_path(parts.uri.path());
        target.set_query(parts.uri.query());
        let uri = Uri::try_from(target.as_str())
            .map_err(axum::http::Error::from)?;

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .version(parts.version);

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
            if let Ok(value) = HeaderValue::from_str(request_id) {
                headers.insert("x-request-id", value);
            }
        }

        builder.body(Body::from(body.clone()))
    }
}
