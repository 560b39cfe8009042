//! SNI-based certificate selection.

use std::collections::HashMap;
use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::net::tls::CertificateSet;

/// Picks a certificate by the server name the client announced.
///
/// Names match case-insensitively. Clients without SNI, or naming a host
/// with no certificate of its own, get the first certificate loaded.
pub struct SniResolver {
    by_name: HashMap<String, Arc<CertifiedKey>>,
    default: Option<Arc<CertifiedKey>>,
}

impl SniResolver {
    pub fn new(certificates: &CertificateSet) -> Self {
        let mut by_name = HashMap::new();
        for loaded in certificates.iter() {
            if let Some(name) = &loaded.server_name {
                by_name.insert(name.to_ascii_lowercase(), Arc::clone(&loaded.key));
            }
        }

        Self {
            by_name,
            default: certificates.first().map(|loaded| Arc::clone(&loaded.key)),
        }
    }

    /// Certificate for `server_name`, falling back to the default.
    pub fn select(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        server_name
            .and_then(|name| self.by_name.get(&name.to_ascii_lowercase()))
            .or(self.default.as_ref())
            .cloned()
    }
}

impl std::fmt::Debug for SniResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SniResolver")
            .field("names", &self.by_name.keys().collect::<Vec<_>>())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl ResolvesServerCert for SniResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name();
        let selected = self.select(server_name);
        if selected.is_none() {
            tracing::warn!(server_name = ?server_name, "No certificate available for handshake");
        }
        selected
    }
}
