//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router whose single fallback handler routes by Host
//! - Wire up middleware (tracing spans)
//! - Serve plaintext on a Tokio listener and TLS through axum-server
//! - Emit one access log line per request

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use hyper_util::rt::TokioTimer;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::http::request::{RequestContext, Transport};
use crate::routing::HostRouter;

/// Cap on buffered request head bytes per TLS connection.
pub const MAX_HEADER_BYTES: usize = 1 << 20;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<HostRouter>,
    pub transport: Transport,
}

/// HTTP front end for the host router.
pub struct HttpServer {
    router: Arc<HostRouter>,
}

impl HttpServer {
    pub fn new(router: Arc<HostRouter>) -> Self {
        Self { router }
    }

    /// Build the Axum router for a listener of the given transport.
    pub fn app(&self, transport: Transport) -> Router {
        let state = AppState {
            router: Arc::clone(&self.router),
            transport,
        };

        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Serve plaintext HTTP on `listener` until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .app(Transport::Http)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `handle` is shut down.
    ///
    /// Clients must finish sending request headers within
    /// `header_read_timeout`, and heads larger than [`MAX_HEADER_BYTES`]
    /// are rejected.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        config: RustlsConfig,
        handle: Handle,
        header_read_timeout: Duration,
    ) -> Result<(), std::io::Error> {
        let app = self
            .app(Transport::Https)
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut server = axum_server::bind_rustls(addr, config).handle(handle);
        server
            .http_builder()
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(header_read_timeout)
            .max_buf_size(MAX_HEADER_BYTES);

        server.serve(app).await?;

        tracing::info!("TLS server stopped");
        Ok(())
    }
}

/// Routes every request by Host and logs its outcome.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start_time = Instant::now();
    let ctx = RequestContext::from_request(&request, state.transport);

    tracing::debug!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        host = %ctx.host_or_dash(),
        path = %ctx.path,
        "Routing request"
    );

    let response = state.router.route(request, &ctx).await;

    tracing::info!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        host = %ctx.host_or_dash(),
        path = %ctx.path,
        remote_addr = %ctx.peer.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
        user_agent = %ctx.user_agent,
        scheme = ctx.transport.scheme(),
        status = response.status().as_u16(),
        elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0,
        "Request finished"
    );

    response
}
