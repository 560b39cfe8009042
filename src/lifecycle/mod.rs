//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load host table → Build client and router → Start reload, TLS, HTTP
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every subscriber (HTTP, TLS, reload) stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: host table first, listeners last
//! - One broadcast channel fans shutdown out to every task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
pub use startup::{Proxy, StartupError};
