//! Backend dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Router selects a BackendDispatcher
//!     → dispatcher.rs (rewrite URI and Host, forward)
//!     → headers.rs (drop hop-by-hop, add X-Forwarded-*)
//!     → client.rs (shared pooled HTTP/HTTPS client)
//!     → backend response streamed back, or uniform 503
//! ```

use std::time::Duration;

use thiserror::Error;

pub mod client;
pub mod dispatcher;
pub mod headers;

pub use client::BackendClient;
pub use dispatcher::BackendDispatcher;

/// Failure to obtain a response from a backend.
///
/// Logged with full detail; clients only ever see a 503.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid backend target: {0}")]
    InvalidTarget(String),

    #[error("failed to build outbound request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("backend request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),
}
