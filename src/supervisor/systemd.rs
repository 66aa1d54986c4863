//! systemd-backed supervisor.

use std::collections::BTreeMap;
use std::process::Command;

use dashmap::DashMap;

use crate::config::SupervisorConfig;
use crate::supervisor::{ExpectedState, ServiceSupervisor, SupervisorError};

/// Drives services through `systemctl`.
pub struct SystemdSupervisor {
    systemctl: String,
    units: BTreeMap<String, String>,
    restart_only: bool,
    expected: DashMap<String, ExpectedState>,
}

impl SystemdSupervisor {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            systemctl: config.systemctl.clone(),
            units: config.services.clone(),
            restart_only: config.restart_only,
            expected: DashMap::new(),
        }
    }

    /// The last declared intent for a service, if any.
    pub fn expected_state(&self, service: &str) -> Option<ExpectedState> {
        self.expected.get(service).map(|r| r.value().clone())
    }

    fn unit(&self, service: &str) -> Result<&str, SupervisorError> {
        self.units
            .get(service)
            .map(String::as_str)
            .ok_or_else(|| SupervisorError::UnknownService(service.to_string()))
    }

    fn systemctl(&self, action: &str, unit: &str) -> Result<(), SupervisorError> {
        let output = Command::new(&self.systemctl).arg(action).arg(unit).output()?;
        if output.status.success() {
            tracing::debug!(action, unit, "systemctl succeeded");
            Ok(())
        } else {
            Err(SupervisorError::Command {
                action: action.to_string(),
                unit: unit.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn is_active(&self, unit: &str) -> Result<bool, SupervisorError> {
        let status = Command::new(&self.systemctl)
            .args(["is-active", "--quiet", unit])
            .status()?;
        Ok(status.success())
    }

    fn declare(&self, service: &str, state: ExpectedState) {
        tracing::debug!(service, state = ?state, "Service intent declared");
        self.expected.insert(service.to_string(), state);
    }
}

impl ServiceSupervisor for SystemdSupervisor {
    fn on(&self, service: &str) {
        self.declare(service, ExpectedState::On);
    }

    fn off(&self, service: &str, reason: &str) {
        self.declare(service, ExpectedState::Off(reason.to_string()));
    }

    fn any(&self, service: &str, reason: &str) {
        self.declare(service, ExpectedState::Any(reason.to_string()));
    }

    fn ensure_service(&self, service: &str) -> Result<(), SupervisorError> {
        let unit = self.unit(service)?;
        match self.expected_state(service) {
            Some(ExpectedState::On) => {
                if !self.is_active(unit)? {
                    tracing::info!(service, unit, "Starting service");
                    self.systemctl("start", unit)?;
                }
            }
            Some(ExpectedState::Off(reason)) => {
                if self.is_active(unit)? {
                    tracing::info!(service, unit, reason = %reason, "Stopping service");
                    self.systemctl("stop", unit)?;
                }
            }
            Some(ExpectedState::Any(reason)) => {
                tracing::debug!(service, reason = %reason, "Service managed elsewhere");
            }
            None => {
                tracing::debug!(service, "No intent declared; leaving service as is");
            }
        }
        Ok(())
    }

    fn restart_service(&self, service: &str) -> Result<(), SupervisorError> {
        let unit = self.unit(service)?;
        self.systemctl("restart", unit)
    }

    fn reload_service(&self, service: &str) -> Result<(), SupervisorError> {
        let unit = self.unit(service)?;
        self.systemctl("reload", unit)
    }

    fn restart_only(&self) -> bool {
        self.restart_only
    }
}
