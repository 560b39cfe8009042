//! Host-header reverse proxy.
//!
//! Reads a host table (`hostname backend-url` per line), forwards each
//! request to the backend named for its `Host` header and answers 503 for
//! everything else. The table is re-read on an interval.
//!
//! ```text
//!   client ──▶ HTTP / TLS listener ──▶ HostRouter ──▶ BackendDispatcher ──▶ backend
//!                                          ▲
//!                     ReloadScheduler ─────┘ (atomic table swap)
//! ```

use std::path::PathBuf;

use clap::Parser;

use host_proxy::config::schema::LogFormat;
use host_proxy::config::{load_config, ProxyConfig};
use host_proxy::lifecycle::{shutdown_on_signal, Proxy, Shutdown};
use host_proxy::observability::init_logging;

#[derive(Parser)]
#[command(name = "host-proxy")]
#[command(about = "Reverse proxy routing requests by Host header", long_about = None)]
struct Cli {
    /// TOML settings file; flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Plaintext listen address.
    #[arg(long)]
    http: Option<String>,

    /// TLS listen address.
    #[arg(long)]
    https: Option<String>,

    /// Primary TLS certificate (PEM).
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Primary TLS private key (PEM).
    #[arg(long)]
    key: Option<PathBuf>,

    /// Host table file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between host table reloads.
    #[arg(long)]
    reload_interval: Option<u64>,

    /// Catch-all backend for unknown hosts.
    #[arg(long)]
    default_backend: Option<String>,

    /// Log output format (pretty or json).
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(http) = self.http {
            config.listener.http_address = http;
        }
        if let Some(https) = self.https {
            config.listener.https_address = https;
        }
        if let Some(cert) = self.cert {
            config.tls.cert_path = Some(cert);
        }
        if let Some(key) = self.key {
            config.tls.key_path = Some(key);
        }
        if let Some(path) = self.config {
            config.routes.path = path;
        }
        if let Some(secs) = self.reload_interval {
            config.routes.reload_interval_secs = secs;
        }
        if let Some(backend) = self.default_backend {
            config.routes.default_backend = Some(backend);
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config.logging.verbose |= self.verbose;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.settings {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(&config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "host-proxy starting");

    let proxy = Proxy::new(config)?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    proxy.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
