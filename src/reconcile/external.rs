//! The rack external services loop.
//!
//! # Responsibilities
//! - Fetch a snapshot from the region once per tick
//! - Reconcile every service concurrently against it
//! - Isolate and log each service failure
//! - Pick the next interval from connectivity

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::reconcile::cadence::{Cadence, Intervals};
use crate::region::client::{ConnectionRegistry, RegionClient, RpcError};
use crate::services::{ExternalService, ReconcileOutcome};
use crate::snapshot::Snapshot;

/// Why a tick's fetch was skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("node not yet recognised by the region")]
    UnknownNode,

    #[error("region not yet available")]
    NoConnections,

    #[error("failed to get external services configuration: {0}")]
    Other(RpcError),
}

impl From<RpcError> for FetchError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::NoSuchNode(_) => FetchError::UnknownNode,
            RpcError::NoConnectionsAvailable => FetchError::NoConnections,
            other => FetchError::Other(other),
        }
    }
}

/// What one tick did.
#[derive(Debug)]
pub struct TickReport {
    /// Set when the fetch failed and no service ran.
    pub skipped: Option<FetchError>,
    pub outcomes: Vec<(&'static str, ReconcileOutcome)>,
    pub cadence: Cadence,
}

impl TickReport {
    pub fn outcome(&self, service: &str) -> Option<&ReconcileOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| *name == service)
            .map(|(_, outcome)| outcome)
    }
}

/// Keeps the rack's time, DNS and proxy services in line with the region.
pub struct RackExternalService {
    system_id: String,
    client: Arc<dyn RegionClient>,
    registry: Arc<dyn ConnectionRegistry>,
    services: Vec<Box<dyn ExternalService>>,
    intervals: Intervals,
    cadence: Cadence,
}

impl RackExternalService {
    pub fn new(
        system_id: impl Into<String>,
        client: Arc<dyn RegionClient>,
        registry: Arc<dyn ConnectionRegistry>,
        services: Vec<Box<dyn ExternalService>>,
        intervals: Intervals,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            client,
            registry,
            services,
            intervals,
            cadence: Cadence::Fast,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Delay before the next tick.
    pub fn interval(&self) -> Duration {
        self.intervals.interval(self.cadence)
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let system_id = self.system_id.as_str();
        let controller = self.client.controller_type(system_id).await?;
        let time = self.client.time_configuration(system_id).await?;
        let dns = self.client.dns_configuration(system_id).await?;
        let proxy = self.client.proxy_configuration(system_id).await?;

        Ok(Snapshot::new(controller, time, dns, proxy, self.registry.connections()))
    }

    /// Fetch, reconcile every service, then pick the next cadence.
    pub async fn tick(&mut self) -> TickReport {
        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                match &e {
                    FetchError::UnknownNode | FetchError::NoConnections => {
                        tracing::debug!(reason = %e, "Skipping external services update");
                    }
                    FetchError::Other(_) => {
                        tracing::error!(error = %e, "Failed to get external services configurations");
                    }
                }
                self.transition(Cadence::Fast);
                return TickReport {
                    skipped: Some(e),
                    outcomes: Vec::new(),
                    cadence: self.cadence,
                };
            }
        };

        let snapshot = &snapshot;
        let outcomes = join_all(self.services.iter_mut().map(|service| async move {
            let name = service.name();
            (name, service.reconcile(snapshot).await)
        }))
        .await;

        for (name, outcome) in &outcomes {
            match outcome {
                ReconcileOutcome::Failed(e) => {
                    tracing::error!(service = *name, error = %e, "Failed to update {} configuration", name);
                }
                ReconcileOutcome::Applied => {
                    tracing::debug!(service = *name, "Configuration applied");
                }
                ReconcileOutcome::Unchanged => {
                    tracing::trace!(service = *name, "Configuration unchanged");
                }
            }
        }

        self.transition(Cadence::for_connections(&snapshot.connections));
        TickReport {
            skipped: None,
            outcomes,
            cadence: self.cadence,
        }
    }

    fn transition(&mut self, next: Cadence) {
        if next != self.cadence {
            tracing::info!(
                from = %self.cadence,
                to = %next,
                interval_secs = self.intervals.interval(next).as_secs(),
                "Update interval changed"
            );
        }
        self.cadence = next;
    }

    /// Tick until shutdown. An in-flight tick always runs to completion.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            system_id = %self.system_id,
            services = self.services.len(),
            fast_secs = self.intervals.fast.as_secs(),
            slow_secs = self.intervals.slow.as_secs(),
            "Rack external services starting"
        );

        loop {
            self.tick().await;

            tokio::select! {
                _ = time::sleep(self.interval()) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Rack external services received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
