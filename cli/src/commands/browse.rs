// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! `ls`, `stat` and `listat` against a freshly discovered local host.
//!
//! Without running jobs the topology only holds the interfaces, so these are
//! mostly useful inside the shell. The one-shot commands exist for scripting.

use lookout_common::config::Config;
use lookout_core::controller::Controller;

use crate::commands::open_controller;
use crate::lprint;
use crate::terminal::format;

pub fn ls(path: &str, cfg: &Config) -> anyhow::Result<()> {
    list_names(&open_controller(cfg)?, path, cfg)
}

pub fn stat(path: &str, cfg: &Config) -> anyhow::Result<()> {
    show_stat(&open_controller(cfg)?, path, cfg)
}

pub fn listat(path: &str, cfg: &Config) -> anyhow::Result<()> {
    show_listat(&open_controller(cfg)?, path, cfg)
}

pub fn list_names(controller: &Controller, path: &str, cfg: &Config) -> anyhow::Result<()> {
    let names = controller.list(path)?;
    if cfg.json {
        lprint!("{}", serde_json::to_string(&names)?);
    } else {
        for name in names {
            lprint!("{}", name);
        }
    }
    Ok(())
}

pub fn show_stat(controller: &Controller, path: &str, cfg: &Config) -> anyhow::Result<()> {
    format::print_stat(&controller.stat(path)?, 0, cfg)
}

pub fn show_listat(controller: &Controller, path: &str, cfg: &Config) -> anyhow::Result<()> {
    for (idx, stat) in controller.listat(path)?.iter().enumerate() {
        format::print_stat(stat, idx, cfg)?;
    }
    Ok(())
}
