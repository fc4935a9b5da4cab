// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::models::object::ContextKind;

/// Failures raised by the topology primitives ([`Port`], [`Host`], [`Interface`]).
///
/// Construction errors are raised before anything is allocated, and
/// collection errors leave the receiving collection untouched.
///
/// [`Port`]: crate::models::port::Port
/// [`Host`]: crate::models::host::Host
/// [`Interface`]: crate::models::interface::Interface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Port number outside `1..=65535`.
    #[error("invalid port number: {0}")]
    InvalidNumber(i64),

    /// Transport protocol other than `tcp` or `udp`.
    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    /// Not a dotted-quad IPv4 address.
    #[error("invalid ip address: {0}")]
    InvalidAddress(String),

    /// State name the entity does not know about.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An entity with the same natural key is already present.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// The object handed over does not belong to the receiver.
    #[error("object does not belong to this {0}")]
    Foreign(&'static str),
}

/// Failures while looking up or validating a job manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("job manifest not found: {0}")]
    NotFound(String),

    #[error("failed to read manifest {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {name}: {source}")]
    Syntax {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pattern in manifest {name}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown event type in manifest {name}: {event}")]
    UnknownEvent { name: String, event: String },

    #[error("unknown context in manifest {name}: {context}")]
    UnknownContext { name: String, context: String },

    /// An argument uses a placeholder the shallowest accepted context can not fill.
    #[error("manifest {name} uses {{{placeholder}}} which a {context} context does not provide")]
    Placeholder {
        name: String,
        placeholder: String,
        context: ContextKind,
    },

    /// A rule field would shadow a key every report already carries.
    #[error("manifest {name} uses reserved field name: {field}")]
    ReservedField { name: String, field: String },

    #[error("manifest {0} has no command or no contexts")]
    Empty(String),
}
