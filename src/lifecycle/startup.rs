//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the host table and refuse to start without routes
//! - Build the shared client, route table and router
//! - Start the reload scheduler and the optional TLS listener
//! - Bind the plaintext listener and serve
//!
//! # Design Decisions
//! - Fail fast: an unreadable or empty host table at startup is fatal
//! - TLS failures are logged and disable only the TLS listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::backend::{BackendClient, BackendDispatcher};
use crate::config::schema::parse_listen_address;
use crate::config::table::parse_backend_url;
use crate::config::{CertificateEntry, ConfigError, FileSource, ProxyConfig, ReloadScheduler, RouteSource};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::{TlsError, TlsFrontend};
use crate::routing::{HostRouter, RouteTable};

const EXAMPLE_TABLE: &str = "example.com http://127.0.0.1:8080\nexample2.com http://127.0.0.1:8081\n";

const TLS_DRAIN: Duration = Duration::from_secs(5);

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{origin} has no usable routes; here is an example:\n\n{EXAMPLE_TABLE}")]
    NoRoutes { origin: String },

    #[error("invalid default backend: {0}")]
    DefaultBackend(String),

    #[error("failed to build backend client: {0}")]
    Client(#[from] rustls::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// A fully wired proxy, ready to serve.
pub struct Proxy {
    config: ProxyConfig,
    source: Arc<dyn RouteSource>,
    client: BackendClient,
    routes: Arc<RouteTable>,
    router: Arc<HostRouter>,
    certificates: Vec<CertificateEntry>,
}

impl Proxy {
    /// Wire a proxy reading its host table from `config.routes.path`.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let source = Arc::new(FileSource::new(config.routes.path.clone()));
        Self::with_source(config, source)
    }

    /// Wire a proxy around an arbitrary host table source.
    pub fn with_source(config: ProxyConfig, source: Arc<dyn RouteSource>) -> Result<Self, StartupError> {
        tracing::info!(source = %source.describe(), "Initializing host table");

        let host_table = source.load()?;
        if host_table.is_empty() {
            return Err(StartupError::NoRoutes {
                origin: source.describe(),
            });
        }

        let client = BackendClient::new(&config.timeouts)?;
        let routes = Arc::new(RouteTable::new());
        routes.install(&host_table, &client);

        let mut router = HostRouter::new(Arc::clone(&routes));
        if let Some(raw) = &config.routes.default_backend {
            let url = parse_backend_url(raw).map_err(StartupError::DefaultBackend)?;
            let dispatcher = BackendDispatcher::new(url, client.clone())
                .map_err(|e| StartupError::DefaultBackend(e.to_string()))?;
            tracing::info!(backend = %raw, "Default backend configured");
            router = router.with_fallback(dispatcher);
        }

        Ok(Self {
            certificates: host_table.certificates().to_vec(),
            config,
            source,
            client,
            routes,
            router: Arc::new(router),
        })
    }

    pub fn router(&self) -> Arc<HostRouter> {
        Arc::clone(&self.router)
    }

    pub fn route_table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    pub fn reload_scheduler(&self) -> ReloadScheduler {
        ReloadScheduler::new(
            Arc::clone(&self.source),
            Arc::clone(&self.routes),
            self.client.clone(),
            self.config.routes.reload_interval(),
        )
    }

    /// TLS is attempted when any primary path is set or the table names certificates.
    pub fn tls_enabled(&self) -> bool {
        self.config.tls.is_requested() || !self.certificates.is_empty()
    }

    /// Load certificates for a TLS listener on `address`.
    pub fn tls_frontend(&self, address: SocketAddr) -> Result<TlsFrontend, TlsError> {
        if let Some(missing) = self.config.tls.missing_half() {
            return Err(TlsError::IncompletePair { missing });
        }

        Ok(TlsFrontend::new(
            self.router(),
            address,
            self.config.tls.primary_pair(),
            &self.certificates,
        )?
        .with_header_read_timeout(self.config.timeouts.response()))
    }

    /// Serve until `shutdown` fires.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let address = parse_listen_address(&self.config.listener.http_address)?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;

        tokio::spawn(self.reload_scheduler().run(shutdown.subscribe()));

        if self.tls_enabled() {
            self.spawn_tls(shutdown);
        }

        tracing::info!(address = %listener.local_addr().map_err(StartupError::Serve)?, "Serving HTTP");
        for host in self.routes.hosts() {
            if let Some(dispatcher) = self.routes.lookup(&host) {
                tracing::info!(host = %host, backend = %dispatcher.target(), "Host table entry");
            }
        }

        HttpServer::new(self.router())
            .run(listener, shutdown.subscribe())
            .await
            .map_err(StartupError::Serve)
    }

    fn spawn_tls(&self, shutdown: &Shutdown) {
        let address = match parse_listen_address(&self.config.listener.https_address) {
            Ok(address) => address,
            Err(e) => {
                tracing::error!(error = %e, "TLS listener disabled");
                return;
            }
        };

        let frontend = match self.tls_frontend(address) {
            Ok(frontend) => frontend,
            Err(e) => {
                tracing::error!(error = %e, "TLS listener disabled: certificate load failed");
                return;
            }
        };

        let handle = Handle::new();
        let drain = handle.clone();
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = stop.recv().await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        tokio::spawn(async move {
            if let Err(e) = frontend.run(handle).await {
                tracing::error!(error = %e, "TLS listener stopped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_for(file: &tempfile::NamedTempFile) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.routes.path = file.path().to_path_buf();
        config
    }

    #[test]
    fn empty_table_is_fatal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = Proxy::new(config_for(&file)).err().unwrap();
        assert!(matches!(err, StartupError::NoRoutes { .. }));
        assert!(err.to_string().contains("example.com http://127.0.0.1:8080"));
    }

    #[test]
    fn only_malformed_lines_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one two three").unwrap();
        assert!(matches!(
            Proxy::new(config_for(&file)),
            Err(StartupError::NoRoutes { .. })
        ));
    }

    #[test]
    fn missing_table_is_fatal() {
        let mut config = ProxyConfig::default();
        config.routes.path = "/nonexistent/config.ini".into();
        assert!(matches!(Proxy::new(config), Err(StartupError::Config(_))));
    }

    #[test]
    fn tls_enabled_by_table_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a.com http://127.0.0.1:1").unwrap();
        let proxy = Proxy::new(config_for(&file)).unwrap();
        assert!(!proxy.tls_enabled());

        writeln!(file, "a.com - /certs/a.pem /certs/a.key").unwrap();
        let proxy = Proxy::new(config_for(&file)).unwrap();
        assert!(proxy.tls_enabled());
        assert_eq!(proxy.route_table().hosts(), vec!["a.com"]);
    }

    #[test]
    fn half_configured_primary_pair_fails_tls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a.com http://127.0.0.1:1").unwrap();
        let mut config = config_for(&file);
        config.tls.cert_path = Some("/certs/primary.pem".into());

        let proxy = Proxy::new(config).unwrap();
        assert!(proxy.tls_enabled());
        assert!(matches!(
            proxy.tls_frontend("127.0.0.1:0".parse().unwrap()),
            Err(TlsError::IncompletePair { missing: "key" })
        ));
    }

    #[test]
    fn invalid_default_backend_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a.com http://127.0.0.1:1").unwrap();
        let mut config = config_for(&file);
        config.routes.default_backend = Some("not a url".into());
        assert!(matches!(Proxy::new(config), Err(StartupError::DefaultBackend(_))));
    }
}
