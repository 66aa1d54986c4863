//! File-backed service writers.
//!
//! # Responsibilities
//! - Render time, DNS and proxy configuration fragments
//! - Replace files atomically so daemons never read a partial write
//! - Run the DNS reload command with bounded retries

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{DnsConfig, NtpConfig, ProxyConfig};
use crate::resilience::{retry_blocking, RetryPolicy};
use crate::services::dns::{DnsWriter, DnssecValidation};
use crate::services::ntp::TimeWriter;
use crate::services::proxy::ProxyWriter;
use crate::services::ServiceError;

const HEADER: &str = "# Generated by rack-external. Do not edit.\n";

/// Write `contents` next to `path`, then rename over it.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

pub struct FileTimeWriter {
    path: PathBuf,
}

impl FileTimeWriter {
    pub fn new(config: &NtpConfig) -> Self {
        Self {
            path: config.config_path.clone(),
        }
    }
}

impl TimeWriter for FileTimeWriter {
    fn configure(&self, references: &[String], peers: &[String]) -> io::Result<()> {
        let mut out = String::from(HEADER);
        for server in references {
            out.push_str(&format!("server {} iburst\n", server));
        }
        for peer in peers {
            out.push_str(&format!("peer {}\n", peer));
        }
        write_atomic(&self.path, &out)
    }
}

pub struct FileDnsWriter {
    options_path: PathBuf,
    config_path: PathBuf,
    reload_command: Vec<String>,
    retry: RetryPolicy,
}

impl FileDnsWriter {
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            options_path: config.options_path.clone(),
            config_path: config.config_path.clone(),
            reload_command: config.reload_command.clone(),
            retry: RetryPolicy::from(config),
        }
    }

    fn reload_once(&self) -> Result<(), String> {
        let (program, args) = self
            .reload_command
            .split_first()
            .ok_or_else(|| "empty reload command".to_string())?;

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| format!("{}: {}", program, e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

impl DnsWriter for FileDnsWriter {
    fn write_options(&self, upstream_dns: &[String], dnssec_validation: DnssecValidation) -> io::Result<()> {
        let mut out = String::from(HEADER);
        if !upstream_dns.is_empty() {
            out.push_str("forwarders {\n");
            for server in upstream_dns {
                out.push_str(&format!("    {};\n", server));
            }
            out.push_str("};\n");
        }
        out.push_str(&format!("dnssec-validation {};\n", dnssec_validation.as_str()));
        write_atomic(&self.options_path, &out)
    }

    fn write_configuration(&self, zones: &[String], trusted_networks: &[String]) -> io::Result<()> {
        let mut out = String::from(HEADER);
        out.push_str("acl \"trusted\" {\n");
        for network in trusted_networks {
            out.push_str(&format!("    {};\n", network));
        }
        out.push_str("    localnets;\n    localhost;\n};\n");
        for zone in zones {
            out.push_str(&format!("zone \"{}\" {{ type master; file \"zone.{}\"; }};\n", zone, zone));
        }
        write_atomic(&self.config_path, &out)
    }

    fn reload_with_retries(&self) -> Result<(), ServiceError> {
        retry_blocking(self.retry, "dns reload", || self.reload_once()).map_err(ServiceError::Reload)
    }
}

pub struct FileProxyWriter {
    path: PathBuf,
}

impl FileProxyWriter {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            path: config.config_path.clone(),
        }
    }
}

impl ProxyWriter for FileProxyWriter {
    fn write_config(
        &self,
        allowed_cidrs: &[String],
        peer_proxies: &[String],
        prefer_v4_proxy: bool,
        port: u16,
    ) -> io::Result<()> {
        let mut out = String::from(HEADER);
        for cidr in allowed_cidrs {
            out.push_str(&format!("acl localnet src {}\n", cidr));
        }
        for (index, peer) in peer_proxies.iter().enumerate() {
            out.push_str(&format!("cache_peer_url {} name=region{}\n", peer, index));
        }
        if !peer_proxies.is_empty() {
            out.push_str("never_direct allow all\n");
        }
        if prefer_v4_proxy {
            out.push_str("dns_v4_first on\n");
        }
        out.push_str(&format!("http_port {}\n", port));
        write_atomic(&self.path, &out)
    }
}
