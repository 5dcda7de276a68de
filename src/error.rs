//! Error taxonomy and HTTP mapping.
//!
//! # Design Decisions
//! - One enum for the whole request path; handlers return `Result<_, Error>`
//! - Duplicate client on create surfaces as a store-layer conflict (500),
//!   matching the admin API contract
//! - Deadline expiry is distinct from backend exhaustion: 504 vs 503

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures surfaced by the admission and dispatch pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed client input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Create of a client that already exists.
    #[error("client {0} already exists")]
    Conflict(String),

    /// Quota denial for an admitted client (or an unknown one).
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// No live backend, or the failover attempt budget is exhausted.
    #[error("service not available")]
    ServiceUnavailable,

    /// The per-request deadline elapsed before a terminal outcome.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Store unreachable or a query failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sea_orm::DbErr),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Duplicates are reported by the store layer; the admin API
            // treats them like any other persistence failure.
            Error::Conflict(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Error::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = Response::new(Body::from(self.to_string()));
        *response.status_mut() = status;
        response
    }
}
