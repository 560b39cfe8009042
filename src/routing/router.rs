//! Host-based request routing.
//!
//! # Responsibilities
//! - Look up the request's Host in the live route table
//! - Hand matched requests to that host's dispatcher
//! - Answer unknown hosts with the uniform 503
//!
//! # Design Decisions
//! - Explicit denial rather than a silent default; a catch-all backend is
//!   only used when one is configured
//! - No retry and no fallback across backends

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
};

use crate::backend::BackendDispatcher;
use crate::http::request::RequestContext;
use crate::http::response::unavailable;
use crate::routing::table::RouteTable;

/// Request entry point shared by the plaintext and TLS listeners.
#[derive(Debug)]
pub struct HostRouter {
    table: Arc<RouteTable>,
    fallback: Option<Arc<BackendDispatcher>>,
}

impl HostRouter {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            fallback: None,
        }
    }

    /// Send hosts missing from the table to `dispatcher` instead of a 503.
    pub fn with_fallback(mut self, dispatcher: BackendDispatcher) -> Self {
        self.fallback = Some(Arc::new(dispatcher));
        self
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Dispatcher responsible for `host`, if any.
    pub fn resolve(&self, host: Option<&str>) -> Option<Arc<BackendDispatcher>> {
        host.and_then(|h| self.table.lookup(h))
            .or_else(|| self.fallback.clone())
    }

    /// Route one request to its backend or deny it.
    pub async fn route(&self, request: Request<Body>, ctx: &RequestContext) -> Response<Body> {
        match self.resolve(ctx.host.as_deref()) {
            Some(dispatcher) => dispatcher.dispatch(request, ctx).await,
            None => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    host = %ctx.host_or_dash(),
                    "Denied: host not in route table"
                );
                unavailable()
            }
        }
    }
}
