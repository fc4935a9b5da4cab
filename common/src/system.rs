// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use crate::models::interface::InterfaceConfig;

/// Who and where the engine is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub hostname: String,
}

/// Defines the contract for accessing OS-level information.
///
/// The local host is built on top of this trait, so tests can hand it a fixed
/// set of interfaces instead of whatever the machine running them has.
pub trait SystemRepository {
    /// Resolves the current user and the machine's hostname.
    fn identity(&self) -> anyhow::Result<Identity>;

    /// Retrieves the current configuration of every network interface.
    fn interfaces(&self) -> anyhow::Result<Vec<InterfaceConfig>>;
}
