// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Host Model
//!
//! This module defines the [`Host`] entity, a remote machine discovered behind
//! one local interface.
//!
//! ## Key Concepts
//! * **Identity**: A host is identified by its IPv4 address within the owning interface.
//!   The address never changes after construction.
//! * **Passive**: A host never probes anything by itself. MAC, OS, state and last activity
//!   are filled in by the local host while it applies job events.
//! * **Ports**: Ports are kept per transport protocol and keyed by number, so a
//!   `(protocol, number)` pair exists at most once per host.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pnet::util::MacAddr;
use serde::Serialize;

use crate::error::TopologyError;
use crate::models::object::ObjectId;
use crate::models::port::{Port, Protocol};
use crate::utils::ip;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    #[default]
    Unknown,
    Up,
    Down,
}

impl HostState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostState::Unknown => "unknown",
            HostState::Up => "up",
            HostState::Down => "down",
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostState {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(HostState::Unknown),
            "up" => Ok(HostState::Up),
            "down" => Ok(HostState::Down),
            _ => Err(TopologyError::InvalidState(s.to_string())),
        }
    }
}

/// Represents a discovered remote host.
#[derive(Debug, Clone)]
pub struct Host {
    id: ObjectId,
    ip: Ipv4Addr,

    /// The MAC address (only known for hosts on the same link).
    pub mac: Option<MacAddr>,

    /// Operating system guess reported by a fingerprinting job.
    pub os: Option<String>,

    /// Timestamp of the last job output that mentioned this host.
    pub last_activity: Option<DateTime<Utc>>,

    pub state: HostState,

    tcp: BTreeMap<u16, Port>,
    udp: BTreeMap<u16, Port>,
}

impl Host {
    /// Creates a host from a dotted-quad string.
    pub fn new(ip: &str) -> Result<Self, TopologyError> {
        let addr =
            ip::parse_dotted_quad(ip).ok_or_else(|| TopologyError::InvalidAddress(ip.to_string()))?;
        Ok(Self::from_addr(addr))
    }

    pub fn from_addr(ip: Ipv4Addr) -> Self {
        Self {
            id: ObjectId::next(),
            ip,
            mac: None,
            os: None,
            last_activity: None,
            state: HostState::Unknown,
            tcp: BTreeMap::new(),
            udp: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Ports of one protocol, ordered by number.
    pub fn ports(&self, protocol: Protocol) -> &BTreeMap<u16, Port> {
        match protocol {
            Protocol::Tcp => &self.tcp,
            Protocol::Udp => &self.udp,
        }
    }

    fn ports_mut(&mut self, protocol: Protocol) -> &mut BTreeMap<u16, Port> {
        match protocol {
            Protocol::Tcp => &mut self.tcp,
            Protocol::Udp => &mut self.udp,
        }
    }

    /// Every port of this host, TCP first.
    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.tcp.values().chain(self.udp.values())
    }

    pub fn port(&self, protocol: Protocol, number: u16) -> Option<&Port> {
        self.ports(protocol).get(&number)
    }

    pub fn port_mut(&mut self, protocol: Protocol, number: u16) -> Option<&mut Port> {
        self.ports_mut(protocol).get_mut(&number)
    }

    /// Looks a port up by handle.
    pub fn find_port(&self, id: ObjectId) -> Option<&Port> {
        self.all_ports().find(|port| port.id() == id)
    }

    /// Adds a port. Fails if the `(protocol, number)` pair is taken.
    pub fn add_port(&mut self, port: Port) -> Result<&mut Port, TopologyError> {
        let ports = self.ports_mut(port.protocol());
        if ports.contains_key(&port.number()) {
            return Err(TopologyError::Duplicate(port.to_string()));
        }
        Ok(ports.entry(port.number()).or_insert(port))
    }

    /// Removes the port with the given handle and hands it back.
    pub fn drop_port(&mut self, id: ObjectId) -> Result<Port, TopologyError> {
        let (protocol, number) = self
            .find_port(id)
            .map(|port| (port.protocol(), port.number()))
            .ok_or(TopologyError::Foreign("host"))?;

        self.ports_mut(protocol)
            .remove(&number)
            .ok_or(TopologyError::Foreign("host"))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ip)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_host_has_no_details() {
        let host = Host::new("192.168.0.100").unwrap();
        assert_eq!(host.ip(), Ipv4Addr::new(192, 168, 0, 100));
        assert_eq!(host.state, HostState::Unknown);
        assert!(host.mac.is_none() && host.os.is_none() && host.last_activity.is_none());
        assert_eq!(host.all_ports().count(), 0);
    }

    #[test]
    fn invalid_address_is_rejected() {
        assert_eq!(
            Host::new("10.0.0.300").unwrap_err(),
            TopologyError::InvalidAddress("10.0.0.300".into())
        );
    }

    #[test]
    fn duplicate_port_leaves_collection_untouched() {
        let mut host = Host::new("10.0.0.5").unwrap();
        let first = host.add_port(Port::new(22, "tcp").unwrap()).unwrap().id();

        let err = host.add_port(Port::new(22, "tcp").unwrap()).unwrap_err();
        assert_eq!(err, TopologyError::Duplicate("tcp/22".into()));
        assert_eq!(host.ports(Protocol::Tcp).len(), 1);
        assert_eq!(host.port(Protocol::Tcp, 22).unwrap().id(), first);
    }

    #[test]
    fn same_number_on_both_protocols_is_allowed() {
        let mut host = Host::new("10.0.0.5").unwrap();
        host.add_port(Port::new(53, "tcp").unwrap()).unwrap();
        host.add_port(Port::new(53, "udp").unwrap()).unwrap();

        let all: Vec<String> = host.all_ports().map(|p| p.to_string()).collect();
        assert_eq!(all, vec!["tcp/53", "udp/53"]);
    }

    #[test]
    fn drop_port_rejects_foreign_ports() {
        let mut host = Host::new("10.0.0.5").unwrap();
        let mut other = Host::new("10.0.0.6").unwrap();
        host.add_port(Port::new(80, "tcp").unwrap()).unwrap();
        let foreign = other.add_port(Port::new(80, "tcp").unwrap()).unwrap().id();

        assert_eq!(host.drop_port(foreign).unwrap_err(), TopologyError::Foreign("host"));
        assert_eq!(host.ports(Protocol::Tcp).len(), 1);

        let own = host.port(Protocol::Tcp, 80).unwrap().id();
        assert_eq!(host.drop_port(own).unwrap().number(), 80);
        assert!(host.ports(Protocol::Tcp).is_empty());
    }

    proptest! {
        #[test]
        fn valid_quads_keep_their_exact_text(a: u8, b: u8, c: u8, d: u8) {
            let text = format!("{a}.{b}.{c}.{d}");
            let host = Host::new(&text).unwrap();
            prop_assert_eq!(host.ip().to_string(), text);
        }

        #[test]
        fn garbage_fails_with_invalid_address(s in "[0-9a-z.]{0,16}") {
            prop_assume!(!ip::is_ip(&s));
            prop_assert_eq!(Host::new(&s).unwrap_err(), TopologyError::InvalidAddress(s.clone()));
        }
    }
}
