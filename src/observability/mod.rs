//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (one access line per request, reload and TLS events)
//!     → logging.rs (filter and format, stdout)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event so JSON output is machine readable
//! - Request ID generated per request and carried in log fields only

pub mod logging;

pub use logging::init_logging;
