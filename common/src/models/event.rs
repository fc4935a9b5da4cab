// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::object::{Context, JobId, ObjectRef};

/// What a parsed record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A host was seen (fields: `ip`, `mac`, `state`).
    Host,
    /// A port was seen (fields: `ip`, `proto`, `port`, `state`).
    Port,
    /// An operating system guess (fields: `ip`, `os`).
    Os,
    /// Free-form information that does not touch the topology.
    Notice,
    /// The job reached a terminal state. Never produced by a manifest rule.
    Exit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Host => "host",
            EventKind::Port => "port",
            EventKind::Os => "os",
            EventKind::Notice => "notice",
            EventKind::Exit => "exit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured record parsed out of job output.
///
/// `object` starts as the job's deepest context and is redirected to the
/// affected host or port once the local host applied the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub job: JobId,
    pub kind: EventKind,
    pub fields: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
    pub context: Context,
    pub object: Option<ObjectRef>,
}

impl Event {
    pub fn new(job: JobId, kind: EventKind, context: Context) -> Self {
        Self {
            job,
            kind,
            fields: BTreeMap::new(),
            at: Utc::now(),
            context,
            object: context.deepest(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}
