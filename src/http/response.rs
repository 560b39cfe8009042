//! Client-visible failure responses.
//!
//! Every failure a client can trigger (unknown host, unreachable backend,
//! backend timeout) resolves to the same 503 whose body is the status
//! reason phrase. Nothing about the backend leaks into it.

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

/// The uniform "Service Unavailable" response.
pub fn unavailable() -> Response<Body> {
    let status = StatusCode::SERVICE_UNAVAILABLE;
    let reason = status.canonical_reason().unwrap_or("Service Unavailable");
    (status, reason).into_response()
}
