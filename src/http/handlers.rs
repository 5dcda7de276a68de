//! Request handlers for admission and client administration.

use std::collections::HashMap;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Request, Response, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::error::Error;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::ClientConfig;

/// Largest request body the proxy will buffer for replay across retries.
const MAX_BUFFERED_BODY: usize = 1024 * 1024;

/// `GET /`: admission check followed by dispatch.
pub async fn admit_and_forward(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request<Body>,
) -> Result<Response<Body>, Error> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let client_id = params
        .get("client_id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::BadRequest("client_id is required".to_string()))?
        .clone();

    if !state.limiter.allow(&client_id) {
        tracing::warn!(request_id = %request_id, client_id = %client_id, "Rate limit exceeded");
        metrics::record_rate_limited(&client_id);
        metrics::record_request(request.method().as_str(), 429, start);
        return Err(Error::RateLimitExceeded);
    }
    tracing::debug!(request_id = %request_id, client_id = %client_id, "Request admitted");

    let method = request.method().to_string();
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|e| Error::BadRequest(format!("failed to read request body: {e}")))?;

    let result = state.dispatcher.dispatch(&parts, body, &request_id).await;
    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(err) => err.status_code().as_u16(),
    };
    metrics::record_request(&method, status, start);
    tracing::info!(
        request_id = %request_id,
        client_id = %client_id,
        status = status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    result
}

/// `POST /clients`: create a client and its bucket.
pub async fn add_client(
    State(state): State<AppState>,
    payload: Result<Json<ClientConfig>, JsonRejection>,
) -> Result<(StatusCode, &'static str), Error> {
    let Json(config) = payload.map_err(|e| Error::BadRequest(e.to_string()))?;
    let start = Instant::now();

    state.limiter.add_client(config).await.inspect_err(|e| {
        tracing::error!(error = %e, "Failed to add client");
    })?;

    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Client added");
    Ok((StatusCode::CREATED, "Client added successfully\n"))
}

/// `PUT /clients`: update (or implicitly create) a client's quota.
pub async fn update_client(
    State(state): State<AppState>,
    payload: Result<Json<ClientConfig>, JsonRejection>,
) -> Result<(StatusCode, &'static str), Error> {
    let Json(config) = payload.map_err(|e| Error::BadRequest(e.to_string()))?;
    let start = Instant::now();

    state.limiter.update_client(config).await.inspect_err(|e| {
        tracing::error!(error = %e, "Failed to update client");
    })?;

    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Client updated");
    Ok((StatusCode::OK, "Client updated successfully\n"))
}

/// `DELETE /clients/{client_id}`: remove a client and its bucket.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<(StatusCode, &'static str), Error> {
    let start = Instant::now();

    state.limiter.delete_client(&client_id).await.inspect_err(|e| {
        tracing::error!(client_id = %client_id, error = %e, "Failed to delete client");
    })?;

    tracing::info!(
        client_id = %client_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Client deleted"
    );
    Ok((StatusCode::OK, "Client deleted successfully\n"))
}
