// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;

use crate::debug;
use crate::models::interface::{InterfaceConfig, LinkState};

/// Enumerates the system's network interfaces as engine configurations.
///
/// Loopback devices are skipped. The order is the order reported by the
/// operating system, which becomes the registration order of the local host.
pub fn list_interfaces() -> anyhow::Result<Vec<InterfaceConfig>> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    let gateways: HashMap<String, Ipv4Addr> = default_gateways();

    debug!(
        verbosity = 1,
        "Found {} network interfaces, {} with a default gateway",
        interfaces.len(),
        gateways.len()
    );

    Ok(interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .map(|iface| to_config(iface, &gateways))
        .collect())
}

/// Converts a pnet interface, picking its first IPv4 network.
pub fn to_config(iface: &NetworkInterface, gateways: &HashMap<String, Ipv4Addr>) -> InterfaceConfig {
    let v4 = iface.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) => Some(*v4),
        IpNetwork::V6(_) => None,
    });

    InterfaceConfig {
        name: iface.name.clone(),
        ip: v4.map(|net| net.ip()),
        mask: v4.map(|net| net.mask()),
        gateway: gateways.get(&iface.name).copied(),
        mac: iface.mac.filter(|mac| !mac.is_zero()),
        state: if iface.is_up() {
            LinkState::Up
        } else {
            LinkState::Down
        },
    }
}

/// Default gateway per interface name.
#[cfg(target_os = "linux")]
pub fn default_gateways() -> HashMap<String, Ipv4Addr> {
    std::fs::read_to_string("/proc/net/route")
        .map(|table| parse_route_table(&table))
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
pub fn default_gateways() -> HashMap<String, Ipv4Addr> {
    HashMap::new()
}

/// Parses the kernel routing table (`/proc/net/route` layout).
///
/// Addresses in that file are the in-memory word printed as hex, so
/// `0101A8C0` reads as `192.168.1.1` on little-endian machines.
pub fn parse_route_table(table: &str) -> HashMap<String, Ipv4Addr> {
    let mut gateways = HashMap::new();

    for line in table.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let [iface, destination, gateway, ..] = cols.as_slice() else {
            continue;
        };
        if *destination != "00000000" {
            continue;
        }
        let Ok(raw) = u32::from_str_radix(gateway, 16) else {
            continue;
        };
        if raw == 0 {
            continue;
        }
        gateways
            .entry(iface.to_string())
            .or_insert_with(|| Ipv4Addr::from(raw.to_ne_bytes()));
    }

    gateways
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
