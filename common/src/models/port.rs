// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Port Model
//!
//! A transport-layer port on a remote [`Host`](crate::models::host::Host).
//! The `(protocol, number)` pair is fixed at construction; state and last
//! activity are filled in later from job output.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TopologyError;
use crate::models::object::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Tcp, Protocol::Udp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(TopologyError::InvalidProtocol(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    #[default]
    Unknown,
    Open,
    Closed,
    Filtered,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Unknown => "unknown",
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortState {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(PortState::Unknown),
            "open" => Ok(PortState::Open),
            "closed" => Ok(PortState::Closed),
            "filtered" => Ok(PortState::Filtered),
            _ => Err(TopologyError::InvalidState(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    id: ObjectId,
    number: u16,
    protocol: Protocol,

    /// Timestamp of the last job output that mentioned this port.
    pub last_activity: Option<DateTime<Utc>>,

    pub state: PortState,
}

impl Port {
    /// Creates a port from raw user input.
    ///
    /// The number is checked before the protocol, so `Port::new(0, "sctp")`
    /// reports the number.
    pub fn new(number: i64, protocol: &str) -> Result<Self, TopologyError> {
        let number = Self::check_number(number)?;
        let protocol: Protocol = protocol.parse()?;
        Ok(Self::build(number, protocol))
    }

    pub fn with_protocol(number: i64, protocol: Protocol) -> Result<Self, TopologyError> {
        let number = Self::check_number(number)?;
        Ok(Self::build(number, protocol))
    }

    fn check_number(number: i64) -> Result<u16, TopologyError> {
        match u16::try_from(number) {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(TopologyError::InvalidNumber(number)),
        }
    }

    fn build(number: u16, protocol: Protocol) -> Self {
        Self {
            id: ObjectId::next(),
            number,
            protocol,
            last_activity: None,
            state: PortState::Unknown,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.number)
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
