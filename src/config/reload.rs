//! Periodic host table reload.
//!
//! Every tick: Idle → Loading (read the source) → Installed (swap the table)
//! → Idle. A failed load leaves the running table untouched and is retried
//! on the next tick.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::backend::BackendClient;
use crate::config::loader::ConfigError;
use crate::config::table::RouteSource;
use crate::routing::RouteTable;

/// Why a reload attempt kept the previous table.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Source(#[from] ConfigError),

    #[error("reload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Background task that refreshes a [`RouteTable`] from a [`RouteSource`].
pub struct ReloadScheduler {
    source: Arc<dyn RouteSource>,
    table: Arc<RouteTable>,
    client: BackendClient,
    interval: Duration,
}

impl ReloadScheduler {
    pub fn new(
        source: Arc<dyn RouteSource>,
        table: Arc<RouteTable>,
        client: BackendClient,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            table,
            client,
            interval,
        }
    }

    /// Load the source once and install the result. Returns the route count.
    pub async fn reload_once(&self) -> Result<usize, ReloadError> {
        tracing::debug!(source = %self.source.describe(), "Reloading host table");

        let source = Arc::clone(&self.source);
        let host_table = tokio::task::spawn_blocking(move || source.load()).await??;

        Ok(self.table.install(&host_table, &self.client))
    }

    /// Reload on every interval until shutdown. The first reload happens one
    /// interval after start; the initial table is installed by startup.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            source = %self.source.describe(),
            "Reload scheduler starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reload_once().await {
                        tracing::error!(
                            error = %e,
                            routes = self.table.len(),
                            "Host table reload failed; keeping current table"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reload scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
