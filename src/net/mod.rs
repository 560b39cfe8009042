//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TLS connection
//!     → sni.rs (choose certificate by server name)
//!     → tls.rs (handshake via rustls, then the shared HTTP app)
//!     → Hand off to HTTP layer marked as Transport::Https
//! ```
//!
//! # Design Decisions
//! - Certificates are loaded once at startup
//! - Without SNI, or for names with no certificate, the first loaded
//!   certificate is presented

pub mod sni;
pub mod tls;

pub use sni::SniResolver;
pub use tls::{CertificateSet, TlsError, TlsFrontend};
