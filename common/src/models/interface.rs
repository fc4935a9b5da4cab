// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Interface Model
//!
//! One local network interface together with every [`Host`] discovered behind it.
//!
//! The configuration part ([`InterfaceConfig`]) is a plain value. It is never
//! edited in place: [`Interface::refresh`] either hands the instance back untouched
//! or builds a new one with the fresh configuration, moving the host collection over.
//! Callers keying anything on interfaces must use the name, never the instance.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;
use pnet::util::MacAddr;
use serde::Serialize;

use crate::error::TopologyError;
use crate::models::host::Host;
use crate::models::object::ObjectId;
use crate::utils::ip;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
    #[default]
    Unknown,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Up => "up",
            LinkState::Down => "down",
            LinkState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of an interface as reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub name: String,
    pub ip: Option<Ipv4Addr>,
    /// Netmask in full format, e.g. `255.255.255.0`.
    pub mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub mac: Option<MacAddr>,
    pub state: LinkState,
}

impl InterfaceConfig {
    /// A configuration with nothing but a name, useful for fixed setups.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: None,
            mask: None,
            gateway: None,
            mac: None,
            state: LinkState::Unknown,
        }
    }
}

/// Outcome of [`Interface::refresh`].
#[derive(Debug)]
pub enum Refresh {
    Unchanged(Interface),
    Changed(Interface),
}

impl Refresh {
    pub fn into_inner(self) -> Interface {
        match self {
            Refresh::Unchanged(interface) | Refresh::Changed(interface) => interface,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Refresh::Changed(_))
    }
}

#[derive(Debug)]
pub struct Interface {
    id: ObjectId,
    config: InterfaceConfig,
    hosts: BTreeMap<Ipv4Addr, Host>,
}

impl Interface {
    pub fn new(config: InterfaceConfig) -> Self {
        Self {
            id: ObjectId::next(),
            config,
            hosts: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.config.ip
    }

    pub fn mask(&self) -> Option<Ipv4Addr> {
        self.config.mask
    }

    pub fn gateway(&self) -> Option<Ipv4Addr> {
        self.config.gateway
    }

    pub fn mac(&self) -> Option<MacAddr> {
        self.config.mac
    }

    pub fn state(&self) -> LinkState {
        self.config.state
    }

    /// The subnet this interface is attached to, if ip and mask are known.
    pub fn network(&self) -> Option<Ipv4Network> {
        ip::network(self.config.ip?, self.config.mask?)
    }

    /// Returns `true` if `addr` lies inside the attached subnet.
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        self.network().is_some_and(|net| net.contains(addr))
    }

    /// Known hosts, ordered by address.
    pub fn hosts(&self) -> &BTreeMap<Ipv4Addr, Host> {
        &self.hosts
    }

    pub fn host(&self, ip: Ipv4Addr) -> Option<&Host> {
        self.hosts.get(&ip)
    }

    pub fn host_mut(&mut self, ip: Ipv4Addr) -> Option<&mut Host> {
        self.hosts.get_mut(&ip)
    }

    pub fn find_host(&self, id: ObjectId) -> Option<&Host> {
        self.hosts.values().find(|host| host.id() == id)
    }

    pub fn find_host_mut(&mut self, id: ObjectId) -> Option<&mut Host> {
        self.hosts.values_mut().find(|host| host.id() == id)
    }

    /// Adds a host. Fails if a host with the same address is already known.
    pub fn add_host(&mut self, host: Host) -> Result<&mut Host, TopologyError> {
        if self.hosts.contains_key(&host.ip()) {
            return Err(TopologyError::Duplicate(host.ip().to_string()));
        }
        Ok(self.hosts.entry(host.ip()).or_insert(host))
    }

    /// Removes the host with the given handle and hands it back.
    pub fn drop_host(&mut self, id: ObjectId) -> Result<Host, TopologyError> {
        let ip = self
            .find_host(id)
            .map(Host::ip)
            .ok_or(TopologyError::Foreign("interface"))?;
        self.hosts
            .remove(&ip)
            .ok_or(TopologyError::Foreign("interface"))
    }

    /// Compares against a freshly queried configuration.
    ///
    /// The name and the handle survive a refresh. So does the host collection,
    /// which is moved into the new instance as is.
    pub fn refresh(self, current: &InterfaceConfig) -> Refresh {
        let mut fresh = current.clone();
        fresh.name = self.config.name.clone();

        if fresh == self.config {
            return Refresh::Unchanged(self);
        }

        Refresh::Changed(Interface {
            id: self.id,
            config: fresh,
            hosts: self.hosts,
        })
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
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
