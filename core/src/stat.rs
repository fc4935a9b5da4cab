// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! External representations handed to clients.
//!
//! Records are plain data and never borrow from the topology, so they can be
//! kept, printed or serialized after the graph changed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use lookout_common::models::event::EventKind;
use lookout_common::models::host::{Host, HostState};
use lookout_common::models::interface::{Interface, LinkState};
use lookout_common::models::object::JobId;
use lookout_common::models::port::{Port, PortState, Protocol};

use crate::job::JobState;
use crate::localhost::LocalHost;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Stat {
    LocalHost {
        username: String,
        hostname: String,
    },
    Interface {
        name: String,
        ip: Option<String>,
        mask: Option<String>,
        mac: Option<String>,
        gateway: Option<String>,
        state: LinkState,
    },
    Host {
        ip: String,
        mac: Option<String>,
        os: Option<String>,
        last_activity: Option<DateTime<Utc>>,
        state: HostState,
    },
    Port {
        number: u16,
        proto: Protocol,
        last_activity: Option<DateTime<Utc>>,
        state: PortState,
    },
    Protocol {
        name: Protocol,
    },
}

impl From<&LocalHost> for Stat {
    fn from(localhost: &LocalHost) -> Self {
        Stat::LocalHost {
            username: localhost.username().to_string(),
            hostname: localhost.hostname().to_string(),
        }
    }
}

impl From<&Interface> for Stat {
    fn from(interface: &Interface) -> Self {
        Stat::Interface {
            name: interface.name().to_string(),
            ip: interface.ip().map(|a| a.to_string()),
            mask: interface.mask().map(|a| a.to_string()),
            mac: interface.mac().map(|m| m.to_string()),
            gateway: interface.gateway().map(|a| a.to_string()),
            state: interface.state(),
        }
    }
}

impl From<&Host> for Stat {
    fn from(host: &Host) -> Self {
        Stat::Host {
            ip: host.ip().to_string(),
            mac: host.mac.map(|m| m.to_string()),
            os: host.os.clone(),
            last_activity: host.last_activity,
            state: host.state,
        }
    }
}

impl From<&Port> for Stat {
    fn from(port: &Port) -> Self {
        Stat::Port {
            number: port.number(),
            proto: port.protocol(),
            last_activity: port.last_activity,
            state: port.state,
        }
    }
}

impl From<Protocol> for Stat {
    fn from(name: Protocol) -> Self {
        Stat::Protocol { name }
    }
}

/// What `info(jid)` reports about a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
    pub pid: Option<u32>,
    pub return_code: Option<i32>,
    /// Path of the job's context, `/` for global jobs.
    pub context: String,
    pub members: usize,
}

/// One `update()` event as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub job: JobId,
    /// Path of the affected device, `None` for global events.
    pub device: Option<String>,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
