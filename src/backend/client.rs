//! Shared outbound HTTP client.
//!
//! One pooled client serves every dispatcher. It speaks plain HTTP and
//! HTTPS (webpki roots) so backend URLs may use either scheme.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::schema::TimeoutConfig;

pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Pooled client plus the response deadline applied to each dispatch.
#[derive(Clone)]
pub struct BackendClient {
    inner: HttpsClient,
    response_timeout: Duration,
}

impl BackendClient {
    /// Build a client honoring the configured connect and response timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, rustls::Error> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeouts.connect()));

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let inner = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            inner,
            response_timeout: timeouts.response(),
        })
    }

    pub fn http(&self) -> &HttpsClient {
        &self.inner
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}
