//! Request context extraction.
//!
//! # Responsibilities
//! - Generate a request ID for log correlation (never forwarded)
//! - Extract routing-relevant information (host, path)
//! - Record the peer address and the listener's transport
//!
//! # Design Decisions
//! - The Host header is used exactly as received (case and port included);
//!   HTTP/2 requests without one fall back to the URI authority

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request};
use uuid::Uuid;

/// Transport the request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Https,
}

impl Transport {
    /// Scheme name used for `X-Forwarded-Proto`.
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
        }
    }
}

/// Per-request facts shared by routing, dispatch and the access log.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: Method,
    pub host: Option<String>,
    pub path: String,
    pub peer: Option<SocketAddr>,
    pub user_agent: String,
    pub transport: Transport,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>, transport: Transport) -> Self {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()));

        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id: Uuid::new_v4(),
            method: request.method().clone(),
            host,
            path: request.uri().path().to_string(),
            peer,
            user_agent,
            transport,
        }
    }

    /// Host for logging, `-` when absent.
    pub fn host_or_dash(&self) -> &str {
        self.host.as_deref().unwrap_or("-")
    }
}
