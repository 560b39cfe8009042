//! Forwarding to a single backend.
//!
//! # Responsibilities
//! - Rewrite the request URI to the backend's scheme and authority
//! - Rewrite `Host` to the backend's own authority
//! - Stream the request body out and the response body back, aborting
//!   when the backend goes quiet for longer than the read timeout
//! - Turn transport failures into the uniform 503
//!
//! # Design Decisions
//! - No per-request state lives on the dispatcher; failures come back as a
//!   `DispatchError` value owned by the call that produced it
//! - Backend responses are relayed as-is whatever their status; only
//!   failures to obtain a response produce the synthetic 503

use std::str::FromStr;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderValue, Request, Response, Uri, Version,
    },
};
use tower_http::timeout::TimeoutBody;
use url::Url;

use crate::backend::client::BackendClient;
use crate::backend::headers::{set_forwarded, strip_hop_by_hop};
use crate::backend::DispatchError;
use crate::http::request::RequestContext;
use crate::http::response::unavailable;

/// Forwards requests to one backend URL.
pub struct BackendDispatcher {
    target: Url,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
    client: BackendClient,
}

impl BackendDispatcher {
    pub fn new(target: Url, client: BackendClient) -> Result<Self, DispatchError> {
        let scheme = match target.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(DispatchError::InvalidTarget(format!("unsupported scheme {other}"))),
        };

        let host = target
            .host_str()
            .ok_or_else(|| DispatchError::InvalidTarget(format!("{target} has no host")))?;
        let authority = match target.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let host_header = HeaderValue::from_str(&authority)
            .map_err(|e| DispatchError::InvalidTarget(e.to_string()))?;
        let authority = Authority::from_str(&authority)
            .map_err(|e| DispatchError::InvalidTarget(e.to_string()))?;

        Ok(Self {
            target,
            scheme,
            authority,
            host_header,
            client,
        })
    }

    /// The backend URL this dispatcher forwards to.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Forward the request, returning the backend response or a 503.
    pub async fn dispatch(&self, request: Request<Body>, ctx: &RequestContext) -> Response<Body> {
        match self.forward(request, ctx).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    host = %ctx.host_or_dash(),
                    backend = %self.target,
                    error = ?error,
                    "Backend dispatch failed"
                );
                unavailable()
            }
        }
    }

    /// Forward the request, surfacing dispatch-layer failures to the caller.
    pub async fn forward(
        &self,
        request: Request<Body>,
        ctx: &RequestContext,
    ) -> Result<Response<Body>, DispatchError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.outbound_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        set_forwarded(&mut parts.headers, ctx);
        parts.headers.insert(header::HOST, self.host_header.clone());

        let outbound = Request::from_parts(parts, body);
        let timeout = self.client.response_timeout();

        let response = tokio::time::timeout(timeout, self.client.http().request(outbound))
            .await
            .map_err(|_| DispatchError::Timeout(timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);

        // Idle deadline per body frame; a stalled backend aborts the relay.
        let body = TimeoutBody::new(timeout, body);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Backend scheme and authority with the inbound path and query.
    fn outbound_uri(&self, inbound: &Uri) -> Result<Uri, DispatchError> {
        let path = join_paths(self.target.path(), inbound.path());
        let query = merge_queries(self.target.query(), inbound.query());

        let path_and_query = match query {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

impl std::fmt::Debug for BackendDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDispatcher")
            .field("target", &self.target.as_str())
            .finish()
    }
}

/// Join a backend path prefix and a request path with exactly one slash.
fn join_paths(prefix: &str, path: &str) -> String {
    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", prefix, &path[1..]),
        (false, false) => format!("{prefix}/{path}"),
        _ => format!("{prefix}{path}"),
    }
}

fn merge_queries(backend: Option<&str>, inbound: Option<&str>) -> Option<String> {
    match (backend.filter(|q| !q.is_empty()), inbound.filter(|q| !q.is_empty())) {
        (Some(b), Some(i)) => Some(format!("{b}&{i}")),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    }
}
