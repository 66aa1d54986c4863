//! Region-IP selection.
//!
//! # Responsibilities
//! - Group connections by region identity
//! - Pick one stable address per region
//! - Render it for use as a forwarder or inside a URL
//!
//! # Design Decisions
//! - The lowest peer address wins, so iteration order and churn in other
//!   regions never move a region's chosen address
//! - IPv4-mapped IPv6 peers are rendered as plain IPv4

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use crate::region::types::ConnectionSet;

/// One address per distinct region identity, ordered by region identity.
pub fn region_ips(connections: &ConnectionSet, bracket_ipv6: bool) -> Vec<String> {
    let mut per_region: BTreeMap<&str, SocketAddr> = BTreeMap::new();

    for conn in connections.values() {
        per_region
            .entry(conn.region())
            .and_modify(|chosen| {
                if sort_key(conn.address) < sort_key(*chosen) {
                    *chosen = conn.address;
                }
            })
            .or_insert(conn.address);
    }

    per_region
        .into_values()
        .map(|addr| format_ip(addr.ip(), bracket_ipv6))
        .collect()
}

fn sort_key(addr: SocketAddr) -> (IpAddr, u16) {
    (addr.ip(), addr.port())
}

/// Render an address, unwrapping IPv4-mapped IPv6 first.
pub fn format_ip(ip: IpAddr, bracket_ipv6: bool) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None if bracket_ipv6 => format!("[{}]", v6),
            None => v6.to_string(),
        },
    }
}
