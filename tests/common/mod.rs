//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

use host_proxy::config::ProxyConfig;
use host_proxy::http::HttpServer;
use host_proxy::lifecycle::{Proxy, Shutdown};
use host_proxy::routing::RouteTable;

/// Start a backend answering every request with `status` and `body`.
pub async fn start_backend(status: u16, body: &'static str) -> SocketAddr {
    let status = StatusCode::from_u16(status).unwrap();
    serve(Router::new().fallback(move || async move { (status, body) })).await
}

/// Start a backend that answers 200 with a fixed body.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_backend(200, body).await
}

/// Start a backend that echoes what it received, one `name=value` per line.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(uri: Uri, headers: HeaderMap) -> String {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        format!(
            "uri={}\nhost={}\nx-forwarded-host={}\nx-forwarded-proto={}\nx-forwarded-for={}\nconnection={}\n",
            uri,
            header("host"),
            header("x-forwarded-host"),
            header("x-forwarded-proto"),
            header("x-forwarded-for"),
            header("connection"),
        )
    }

    serve(Router::new().fallback(echo)).await
}

/// Start a backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    serve(Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    }))
    .await
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Write a host table to a temp file.
pub fn write_table(text: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), text).unwrap();
    file
}

/// Plaintext client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// GET `path` on the proxy with the given Host header; returns status and body.
pub async fn get(client: &reqwest::Client, proxy: SocketAddr, host: &str, path: &str) -> (u16, String) {
    let response = client
        .get(format!("http://{proxy}{path}"))
        .header("host", host)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

/// A running proxy on an ephemeral plaintext port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub table: Arc<RouteTable>,
    pub proxy: Proxy,
    pub shutdown: Shutdown,
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build a proxy for `table`, serve it on 127.0.0.1:0 and start reloading.
pub async fn spawn_proxy(table: &NamedTempFile, configure: impl FnOnce(&mut ProxyConfig)) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.routes.path = table.path().to_path_buf();
    configure(&mut config);

    let proxy = Proxy::new(config).unwrap();
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(HttpServer::new(proxy.router()).run(listener, shutdown.subscribe()));
    tokio::spawn(proxy.reload_scheduler().run(shutdown.subscribe()));

    TestProxy {
        addr,
        table: proxy.route_table(),
        proxy,
        shutdown,
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
