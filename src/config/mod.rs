//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional) + CLI flags
//!     → loader.rs / schema.rs
//!     → ProxyConfig (immutable, passed to each component)
//!
//! host table file
//!     → table.rs (parse, skip malformed lines)
//!     → HostTable
//!     → RouteTable (startup install)
//!
//! Every reload interval:
//!     reload.rs re-reads the host table
//!     → atomic swap of the route table snapshot
//!     → failures keep the running table
//! ```
//!
//! # Design Decisions
//! - All settings fields have defaults to allow minimal configs
//! - The host table is data, not settings: it is re-read while running,
//!   settings are not

pub mod loader;
pub mod reload;
pub mod schema;
pub mod table;

pub use loader::{load_config, ConfigError};
pub use reload::ReloadScheduler;
pub use schema::{ListenerConfig, ProxyConfig, RoutesConfig, TimeoutConfig, TlsConfig};
pub use table::{parse_host_table, CertificateEntry, FileSource, HostTable, RouteSource};
