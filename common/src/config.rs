// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::time::Duration;

/// Default delay between two `update()` polls of the job registry.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Global configuration options for an engine session.
///
/// Controls where job manifests are looked up, how often running jobs are
/// polled and how the terminal front-end renders results. It is typically
/// constructed from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<name>.toml` job manifests.
    pub manifest_dir: PathBuf,

    /// Delay between two polls of the running jobs.
    ///
    /// The engine never blocks on subprocess I/O, so this is the only knob
    /// deciding how quickly new output turns into events.
    pub poll_interval: Duration,

    /// Toggles the display of the startup banner.
    pub no_banner: bool,

    /// Controls the visual density of the terminal output.
    ///
    /// # Levels
    /// * **0** (Default): Full UI, including colors, spinner and trees.
    /// * **1**: Reduced styling.
    /// * **2**: Raw mode. Output is strictly data, suitable for piping.
    pub quiet: u8,

    /// Disables the interactive keyboard listener used by `run`.
    ///
    /// When `true`, pressing `q` no longer terminates the running job.
    /// Needed in CI and whenever stdin is not a terminal.
    pub disable_input: bool,

    /// Render records as JSON instead of aligned text.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("manifests"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            no_banner: false,
            quiet: 0,
            disable_input: false,
            json: false,
        }
    }
}
