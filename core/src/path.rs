// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Device Paths
//!
//! Maps `/iface[/host[/proto[/port]]]` strings onto the topology. Segments are
//! consumed left to right and each one is looked up among the children of the
//! previous one. Leading and trailing slashes are ignored. An empty segment
//! ends parsing, so `/eth0//junk` resolves like `/eth0`.

use lookout_common::models::host::Host;
use lookout_common::models::interface::Interface;
use lookout_common::models::object::ObjectRef;
use lookout_common::models::port::{Port, Protocol};
use thiserror::Error;

use crate::localhost::LocalHost;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("host not found: {interface}/{host}")]
    HostNotFound { interface: String, host: String },

    #[error("unknown transport proto: {0}")]
    UnknownProtocol(String),

    #[error("invalid port number: {0}")]
    InvalidPortNumber(String),

    #[error("port not found: {proto}/{number}")]
    PortNotFound { proto: Protocol, number: i64 },

    #[error("junk path component: {0}")]
    Junk(String),
}

/// A resolved path. Levels below the deepest matched one are `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pstat<'a> {
    pub interface: Option<&'a Interface>,
    pub host: Option<&'a Host>,
    pub proto: Option<Protocol>,
    pub port: Option<&'a Port>,
}

impl Pstat<'_> {
    /// The deepest real entity. The protocol level has none, so it yields the host.
    pub fn object(&self) -> Option<ObjectRef> {
        if let Some(port) = self.port {
            return Some(ObjectRef::Port(port.id()));
        }
        if let Some(host) = self.host {
            return Some(ObjectRef::Host(host.id()));
        }
        self.interface.map(|i| ObjectRef::Interface(i.id()))
    }

    pub fn is_root(&self) -> bool {
        self.interface.is_none()
    }
}

pub fn resolve<'a>(localhost: &'a LocalHost, path: &str) -> Result<Pstat<'a>, PathError> {
    let mut pstat = Pstat::default();

    for segment in path.trim_matches('/').split('/') {
        if segment.is_empty() {
            break;
        }

        let Some(interface) = pstat.interface else {
            pstat.interface = Some(
                localhost
                    .interface(segment)
                    .ok_or_else(|| PathError::InterfaceNotFound(segment.to_string()))?,
            );
            continue;
        };

        let Some(host) = pstat.host else {
            let found = lookout_common::utils::ip::parse_dotted_quad(segment)
                .and_then(|ip| interface.host(ip));
            pstat.host = Some(found.ok_or_else(|| PathError::HostNotFound {
                interface: interface.name().to_string(),
                host: segment.to_string(),
            })?);
            continue;
        };

        let Some(proto) = pstat.proto else {
            let proto: Protocol = segment
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| PathError::UnknownProtocol(segment.to_string()))?;
            pstat.proto = Some(proto);
            continue;
        };

        if pstat.port.is_none() {
            let number: i64 = segment
                .parse()
                .map_err(|_| PathError::InvalidPortNumber(segment.to_string()))?;
            let port = u16::try_from(number)
                .ok()
                .and_then(|n| host.port(proto, n))
                .ok_or(PathError::PortNotFound { proto, number })?;
            pstat.port = Some(port);
            continue;
        }

        return Err(PathError::Junk(segment.to_string()));
    }

    Ok(pstat)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
