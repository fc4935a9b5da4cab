// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Object Handles
//!
//! Topology entities are stored by their natural key (interface name, host ip,
//! protocol/port number), but ownership checks need something stronger: two
//! interfaces could each know a host `10.0.0.1`. Every entity therefore also
//! carries an [`ObjectId`] that is unique for the lifetime of the process and
//! never reused.
//!
//! Jobs and events refer to entities only through these handles
//! ([`ObjectRef`], [`Context`]). A handle never keeps an entity alive; looking
//! it up in the owning aggregate is the only way to reach the entity.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one topology entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a job inside one `LocalHost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(JobId)
    }
}

/// A non-owning reference to an interface, a host or a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Interface(ObjectId),
    Host(ObjectId),
    Port(ObjectId),
}

impl ObjectRef {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectRef::Interface(id) | ObjectRef::Host(id) | ObjectRef::Port(id) => *id,
        }
    }

    pub fn kind(&self) -> ContextKind {
        match self {
            ObjectRef::Interface(_) => ContextKind::Interface,
            ObjectRef::Host(_) => ContextKind::Host,
            ObjectRef::Port(_) => ContextKind::Port,
        }
    }
}

/// The depth at which a job is bound to the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Global,
    Interface,
    Host,
    Port,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Global => "global",
            ContextKind::Interface => "interface",
            ContextKind::Host => "host",
            ContextKind::Port => "port",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ancestry of the entity a job runs against.
///
/// Shallower levels are always filled in when a deeper one is: a port
/// context names its host and interface too. All levels empty means the
/// job runs in the global (localhost) context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Context {
    pub interface: Option<ObjectId>,
    pub host: Option<ObjectId>,
    pub port: Option<ObjectId>,
}

impl Context {
    pub fn global() -> Self {
        Self::default()
    }

    /// The entity the context is bound to, `None` for the global context.
    pub fn deepest(&self) -> Option<ObjectRef> {
        if let Some(id) = self.port {
            return Some(ObjectRef::Port(id));
        }
        if let Some(id) = self.host {
            return Some(ObjectRef::Host(id));
        }
        self.interface.map(ObjectRef::Interface)
    }

    pub fn kind(&self) -> ContextKind {
        self.deepest()
            .map(|obj| obj.kind())
            .unwrap_or(ContextKind::Global)
    }

    /// Returns `true` if `id` is the bound entity or one of its ancestors.
    pub fn references(&self, id: ObjectId) -> bool {
        [self.interface, self.host, self.port].contains(&Some(id))
    }

    /// The broadest context shared by every entry.
    ///
    /// Levels are compared top-down and the first disagreement truncates the
    /// result, so contexts on different interfaces share only the global one.
    pub fn common(contexts: &[Context]) -> Context {
        let Some((first, rest)) = contexts.split_first() else {
            return Context::global();
        };

        let mut shared = Context::global();
        if first.interface.is_none() || rest.iter().any(|c| c.interface != first.interface) {
            return shared;
        }
        shared.interface = first.interface;

        if first.host.is_none() || rest.iter().any(|c| c.host != first.host) {
            return shared;
        }
        shared.host = first.host;

        if first.port.is_some() && rest.iter().all(|c| c.port == first.port) {
            shared.port = first.port;
        }
        shared
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
