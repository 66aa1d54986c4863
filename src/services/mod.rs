//! Rack-only external services (time, DNS, proxy).
//!
//! # Data Flow
//! ```text
//! &Snapshot
//!     → RackService::derive_configuration (pure)
//!     → Reconciler compares with last applied
//!         equal     → Unchanged
//!         different → RackService::apply (blocking pool)
//!                       ok  → store as last applied → Applied
//!                       err → keep last applied     → Failed
//! ```
//!
//! # Design Decisions
//! - Each adapter owns its last-applied value; nothing is global
//! - `apply` re-checks the controller role itself
//! - Adapters are composed as a list of `ExternalService` trait objects

pub mod dns;
pub mod error;
pub mod files;
pub mod ntp;
pub mod proxy;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::snapshot::Snapshot;
use crate::supervisor::ServiceSupervisor;

pub use dns::{DnsConfiguration, DnsWriter, DnssecValidation, RackDns};
pub use error::ServiceError;
pub use ntp::{NtpConfiguration, RackNtp, TimeWriter};
pub use proxy::{ProxyConfiguration, ProxyWriter, RackProxy};

pub const NTP_SERVICE: &str = "ntp_rack";
pub const DNS_SERVICE: &str = "dns_rack";
pub const PROXY_SERVICE: &str = "proxy_rack";

/// Capability set of one rack-only service adapter.
#[async_trait]
pub trait RackService: Send + Sync {
    /// Adapter-specific slice of a snapshot, plus the role flags.
    type Configuration: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn derive_configuration(&self, snapshot: &Snapshot) -> Self::Configuration;

    /// The only side-effecting step.
    async fn apply(&self, configuration: &Self::Configuration) -> Result<(), ServiceError>;
}

/// Result of reconciling one adapter against one snapshot.
#[derive(Debug)]
pub enum ReconcileOutcome {
    Unchanged,
    Applied,
    Failed(ServiceError),
}

impl ReconcileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReconcileOutcome::Failed(_))
    }
}

/// Object-safe view of a reconciling adapter, as driven by the loop.
#[async_trait]
pub trait ExternalService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reconcile(&mut self, snapshot: &Snapshot) -> ReconcileOutcome;
}

/// Holds an adapter together with the configuration it last applied.
pub struct Reconciler<S: RackService> {
    service: S,
    applied: Option<S::Configuration>,
}

impl<S: RackService> Reconciler<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            applied: None,
        }
    }

    /// The configuration last applied successfully, if any.
    pub fn last_applied(&self) -> Option<&S::Configuration> {
        self.applied.as_ref()
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

#[async_trait]
impl<S: RackService> ExternalService for Reconciler<S> {
    fn name(&self) -> &'static str {
        self.service.name()
    }

    async fn reconcile(&mut self, snapshot: &Snapshot) -> ReconcileOutcome {
        let target = self.service.derive_configuration(snapshot);
        if self.applied.as_ref() == Some(&target) {
            return ReconcileOutcome::Unchanged;
        }

        match self.service.apply(&target).await {
            Ok(()) => {
                self.applied = Some(target);
                ReconcileOutcome::Applied
            }
            Err(e) => ReconcileOutcome::Failed(e),
        }
    }
}

/// The three rack services, in the order they are logged.
pub fn rack_services(
    time_writer: Arc<dyn TimeWriter>,
    dns_writer: Arc<dyn DnsWriter>,
    proxy_writer: Arc<dyn ProxyWriter>,
    supervisor: Arc<dyn ServiceSupervisor>,
) -> Vec<Box<dyn ExternalService>> {
    vec![
        Box::new(Reconciler::new(RackNtp::new(time_writer, supervisor.clone()))),
        Box::new(Reconciler::new(RackDns::new(dns_writer))),
        Box::new(Reconciler::new(RackProxy::new(proxy_writer, supervisor))),
    ]
}
