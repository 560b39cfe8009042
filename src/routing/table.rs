//! The live host → dispatcher table.
//!
//! # Design Decisions
//! - Each reload builds a whole new map off to the side and publishes it with
//!   one atomic pointer swap; readers never take a lock
//! - A lookup holds the snapshot it loaded, so requests already routed
//!   against the old table finish against it
//! - Dispatchers are rebuilt on every reload, never patched in place

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::backend::{BackendClient, BackendDispatcher};
use crate::config::table::HostTable;

/// One immutable generation of the table.
pub type Routes = HashMap<String, Arc<BackendDispatcher>>;

/// Concurrency-safe holder of the current [`Routes`] snapshot.
pub struct RouteTable {
    current: ArcSwap<Routes>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Routes::new()),
        }
    }

    /// Find the dispatcher for an exact hostname.
    pub fn lookup(&self, hostname: &str) -> Option<Arc<BackendDispatcher>> {
        self.current.load().get(hostname).cloned()
    }

    /// Atomically install a fully built table, returning the previous one.
    ///
    /// An empty table is installed like any other, with a warning.
    pub fn replace(&self, routes: Routes) -> Arc<Routes> {
        if routes.is_empty() {
            tracing::warn!("Installing empty route table; every host will receive 503");
        }
        let count = routes.len();
        let previous = self.current.swap(Arc::new(routes));
        tracing::info!(routes = count, previous = previous.len(), "Route table installed");
        previous
    }

    /// Build dispatchers for `table` and install them.
    pub fn install(&self, table: &HostTable, client: &BackendClient) -> usize {
        let routes = build_routes(table, client);
        let count = routes.len();
        self.replace(routes);
        count
    }

    /// The snapshot currently published.
    pub fn snapshot(&self) -> Arc<Routes> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Sorted hostnames for display.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.current.load().keys().cloned().collect();
        hosts.sort();
        hosts
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable").field("hosts", &self.hosts()).finish()
    }
}

/// Build a fresh dispatcher for every route in `table`.
pub fn build_routes(table: &HostTable, client: &BackendClient) -> Routes {
    let mut routes = Routes::with_capacity(table.len());

    for (hostname, backend) in table.routes() {
        match BackendDispatcher::new(backend.clone(), client.clone()) {
            Ok(dispatcher) => {
                routes.insert(hostname.clone(), Arc::new(dispatcher));
            }
            Err(e) => {
                tracing::warn!(host = %hostname, backend = %backend, error = %e, "Skipping route");
            }
        }
    }

    routes
}
