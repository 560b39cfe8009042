//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP or TLS connection
//!     → server.rs (Axum setup, single fallback handler)
//!     → request.rs (request ID, Host, peer, transport)
//!     → routing::HostRouter (lookup and dispatch)
//!     → response.rs (uniform 503 on any failure)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, Transport};
pub use server::HttpServer;
