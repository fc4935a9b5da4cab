// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::env;

use anyhow::Context;

use lookout_common::models::interface::InterfaceConfig;
use lookout_common::system::{Identity, SystemRepository};

/// [`SystemRepository`] backed by the machine the engine runs on.
pub struct SystemRepo;

impl SystemRepository for SystemRepo {
    fn identity(&self) -> anyhow::Result<Identity> {
        let hostname = sys_info::hostname().context("failed to resolve the hostname")?;
        let username = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| String::from("unknown"));

        Ok(Identity { username, hostname })
    }

    fn interfaces(&self) -> anyhow::Result<Vec<InterfaceConfig>> {
        lookout_common::interface::list_interfaces()
    }
}
