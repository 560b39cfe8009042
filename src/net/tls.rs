//! TLS certificate loading and the TLS listener.
//!
//! # Responsibilities
//! - Load every configured certificate/key pair at startup (PEM)
//! - Build a rustls server config that selects certificates by SNI
//! - Serve the shared host router over TLS
//!
//! # Design Decisions
//! - Any pair failing to load aborts the TLS listener before it binds;
//!   the plaintext listener is independent and keeps running
//! - Certificates are static for the process lifetime

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use thiserror::Error;

use crate::config::table::CertificateEntry;
use crate::http::server::HttpServer;
use crate::net::sni::SniResolver;
use crate::routing::HostRouter;

/// Error type for TLS setup and serving.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {}", path.display())]
    NoCertificate { path: PathBuf },

    #[error("no private key found in {}", path.display())]
    NoPrivateKey { path: PathBuf },

    #[error("unsupported private key in {}: {source}", path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    #[error("primary TLS pair is incomplete: {missing} path not set")]
    IncompletePair { missing: &'static str },

    #[error("no certificates configured")]
    Empty,

    #[error("TLS configuration failed: {0}")]
    Config(#[from] rustls::Error),

    #[error("TLS listener failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// A certificate ready for handshakes, with the name it serves (if any).
#[derive(Debug, Clone)]
pub struct LoadedCertificate {
    pub server_name: Option<String>,
    pub key: Arc<CertifiedKey>,
}

/// Ordered certificates served by the TLS listener. The first is the default.
#[derive(Debug, Clone, Default)]
pub struct CertificateSet {
    certificates: Vec<LoadedCertificate>,
}

impl CertificateSet {
    /// Load the primary pair (if any) followed by the host table's entries.
    pub fn load(
        primary: Option<(PathBuf, PathBuf)>,
        entries: &[CertificateEntry],
    ) -> Result<Self, TlsError> {
        let mut certificates = Vec::with_capacity(entries.len() + 1);

        if let Some((cert_path, key_path)) = primary {
            let key = load_certified_key(&cert_path, &key_path)?;
            tracing::info!(cert = %cert_path.display(), "Loaded primary TLS certificate");
            certificates.push(LoadedCertificate {
                server_name: None,
                key: Arc::new(key),
            });
        }

        for entry in entries {
            let key = load_certified_key(&entry.cert_path, &entry.key_path)?;
            tracing::info!(
                server_name = %entry.server_name,
                cert = %entry.cert_path.display(),
                "Loaded TLS certificate"
            );
            certificates.push(LoadedCertificate {
                server_name: Some(entry.server_name.clone()),
                key: Arc::new(key),
            });
        }

        Ok(Self { certificates })
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedCertificate> {
        self.certificates.iter()
    }

    pub fn first(&self) -> Option<&LoadedCertificate> {
        self.certificates.first()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// rustls server config resolving certificates by SNI.
    pub fn server_config(&self) -> Result<ServerConfig, TlsError> {
        if self.is_empty() {
            return Err(TlsError::Empty);
        }

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let mut config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_cert_resolver(Arc::new(SniResolver::new(self)));
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(config)
    }
}

/// Load a PEM certificate chain and private key into a signing-ready pair.
pub fn load_certified_key(cert_path: &Path, key_path: &Path) -> Result<CertifiedKey, TlsError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| TlsError::Read { path, source }
    };

    let mut cert_reader = BufReader::new(File::open(cert_path).map_err(read_err(cert_path))?);
    let chain = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err(cert_path))?;
    if chain.is_empty() {
        return Err(TlsError::NoCertificate {
            path: cert_path.to_path_buf(),
        });
    }

    let mut key_reader = BufReader::new(File::open(key_path).map_err(read_err(key_path))?);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(read_err(key_path))?
        .ok_or_else(|| TlsError::NoPrivateKey {
            path: key_path.to_path_buf(),
        })?;

    let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key).map_err(|source| {
        TlsError::InvalidKey {
            path: key_path.to_path_buf(),
            source,
        }
    })?;

    Ok(CertifiedKey::new(chain, signing_key))
}

/// TLS listener sharing the host router with the plaintext listener.
pub struct TlsFrontend {
    router: Arc<HostRouter>,
    address: SocketAddr,
    certificates: CertificateSet,
    header_read_timeout: Duration,
}

const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(20);

impl TlsFrontend {
    /// Load certificates up front; any failure here is fatal to this listener only.
    pub fn new(
        router: Arc<HostRouter>,
        address: SocketAddr,
        primary: Option<(PathBuf, PathBuf)>,
        entries: &[CertificateEntry],
    ) -> Result<Self, TlsError> {
        let certificates = CertificateSet::load(primary, entries)?;
        if certificates.is_empty() {
            return Err(TlsError::Empty);
        }

        Ok(Self {
            router,
            address,
            certificates,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
        })
    }

    /// Deadline for a client to send its complete request head.
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    pub fn certificates(&self) -> &CertificateSet {
        &self.certificates
    }

    /// Serve until `handle` is shut down.
    pub async fn run(self, handle: Handle) -> Result<(), TlsError> {
        let config = RustlsConfig::from_config(Arc::new(self.certificates.server_config()?));

        tracing::info!(
            address = %self.address,
            certificates = self.certificates.len(),
            "Serving TLS"
        );

        HttpServer::new(self.router)
            .run_tls(self.address, config, handle, self.header_read_timeout)
            .await?;
        Ok(())
    }
}
