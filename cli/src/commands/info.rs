// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use colored::*;
use lookout_common::config::Config;
use lookout_common::manifest::ManifestDir;
use lookout_common::warn;

use crate::commands::open_controller;
use crate::lprint;
use crate::terminal::{
    colors, format,
    print::{self, GLOBAL_KEY_WIDTH},
};

pub fn info(cfg: &Config) -> anyhow::Result<()> {
    let controller = open_controller(cfg)?;

    if cfg.json {
        format::print_stat(&controller.stat("/")?, 0, cfg)?;
        for stat in controller.listat("/")? {
            format::print_stat(&stat, 0, cfg)?;
        }
        return Ok(());
    }

    print::header("about the tool", cfg);
    lprint!(
        "{}",
        "Lookout runs recon tools and maps what they report.".color(colors::TEXT_DEFAULT)
    );
    lprint!();
    GLOBAL_KEY_WIDTH.set(10);
    print::aligned_line("Version", env!("CARGO_PKG_VERSION"));
    print::aligned_line("License", "MPL-2.0");
    print::aligned_line("Manifests", cfg.manifest_dir.display().to_string());

    print::header("local system", cfg);
    let details = format::details(&controller.stat("/")?);
    for (key, value) in details {
        print::aligned_line(&key, value);
    }

    print::header("network interfaces", cfg);
    let interfaces = controller.listat("/")?;
    for (idx, stat) in interfaces.iter().enumerate() {
        format::print_stat(stat, idx, cfg)?;
        if idx + 1 != interfaces.len() {
            lprint!();
        }
    }

    print::header("job manifests", cfg);
    match ManifestDir::new(&cfg.manifest_dir).available() {
        Ok(names) if names.is_empty() => print::print_status("none"),
        Ok(names) => {
            for name in names {
                print::print_status(name);
            }
        }
        Err(e) => warn!("Could not list {}: {}", cfg.manifest_dir.display(), e),
    }
    Ok(())
}
