//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the rack external services agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Identity of this node.
    pub agent: NodeConfig,

    /// Polling cadence.
    pub reconcile: ReconcileConfig,

    /// Region controller endpoints.
    pub region: RegionConfig,

    /// OS service supervision.
    pub supervisor: SupervisorConfig,

    pub ntp: NtpConfig,

    pub dns: DnsConfig,

    pub proxy: ProxyConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// System id the region knows this rack by.
    pub system_id: String,
}

/// Reconcile loop intervals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Interval while no region controller is connected.
    pub fast_interval_secs: u64,

    /// Interval once at least one region controller is connected.
    pub slow_interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: 5,
            slow_interval_secs: 30,
        }
    }
}

/// Region RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Endpoints tried in order.
    pub endpoints: Vec<RegionEndpointConfig>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// One region controller process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionEndpointConfig {
    /// Event-loop label, `<region>:<instance>`.
    pub event_loop: String,

    /// Base URL (e.g., "http://10.0.0.5:5240/").
    pub url: String,
}

/// Service supervisor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Path to `systemctl`.
    pub systemctl: String,

    /// The service manager cannot reload, only restart.
    pub restart_only: bool,

    /// Logical service name → unit name.
    pub services: BTreeMap<String, String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let services = [
            ("ntp_rack", "chrony"),
            ("dns_rack", "bind9"),
            ("proxy_rack", "rack-proxy"),
        ]
        .into_iter()
        .map(|(name, unit)| (name.to_string(), unit.to_string()))
        .collect();

        Self {
            systemctl: "systemctl".to_string(),
            restart_only: false,
            services,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NtpConfig {
    pub config_path: PathBuf,
}

impl Default for NtpConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("/etc/chrony/rack-external.conf"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Forwarders and DNSSEC options fragment.
    pub options_path: PathBuf,

    /// ACL and zone fragment.
    pub config_path: PathBuf,

    /// Command that reloads the name server.
    pub reload_command: Vec<String>,

    /// Total reload attempts.
    pub reload_attempts: u32,

    pub reload_base_delay_ms: u64,

    pub reload_max_delay_ms: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            options_path: PathBuf::from("/etc/bind/rack-external/named.conf.options.inside"),
            config_path: PathBuf::from("/etc/bind/rack-external/named.conf"),
            reload_command: vec!["rndc".to_string(), "reload".to_string()],
            reload_attempts: 10,
            reload_base_delay_ms: 500,
            reload_max_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub config_path: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("/etc/rack-proxy/rack-proxy.conf"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
