//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → router.rs (host lookup, deny or dispatch)
//!     → table.rs (current immutable snapshot)
//!     → Return: BackendDispatcher or uniform 503
//!
//! Reload (config::reload):
//!     HostTable
//!     → build_routes (fresh dispatcher per route)
//!     → RouteTable::replace (single atomic swap)
//! ```
//!
//! # Design Decisions
//! - Exact, case-sensitive host match; no wildcards, no port stripping
//! - Reads are lock-free; the only writer is the reload task

pub mod router;
pub mod table;

pub use router::HostRouter;
pub use table::{RouteTable, Routes};
