// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Command Line Interface Definitions
//!
//! The schema of everything a user can type. Execution lives in the
//! submodules, the arguments and their help text live here.
//!
//! `From<&CommandLine> for Config` is the only place where flags turn into
//! engine settings, so the libraries never see `clap` types.

pub mod browse;
pub mod info;
pub mod run;
pub mod shell;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use lookout_common::config::Config;
use lookout_common::manifest::ManifestDir;
use lookout_core::controller::Controller;
use lookout_core::localhost::LocalHost;
use lookout_core::process::SystemSpawner;
use lookout_core::system::SystemRepo;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "Drives recon tools and keeps a live map of what they find.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the job manifests
    #[arg(
        long = "manifests",
        env = "LOOKOUT_MANIFESTS",
        default_value = "manifests",
        global = true
    )]
    pub manifests: PathBuf,

    /// Milliseconds between two polls of the running jobs
    #[arg(long = "interval", value_name = "MS", default_value_t = 250, global = true)]
    pub interval: u64,

    /// Keep logs and colors but hide the banner
    #[arg(long = "no-banner", global = true)]
    pub no_banner: bool,

    /// Do not listen for `q` while a job runs
    #[arg(long = "no-input", global = true)]
    pub no_input: bool,

    /// Print records as JSON lines
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Reduce UI visual density (-q: reduce styling, -qq: raw records)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Increase logging detail (-v: debug logs, -vv: process plumbing)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display the local host and its interfaces
    #[command(alias = "i")]
    Info,

    /// List the children of a device path
    Ls {
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },

    /// Show the record of a device path
    Stat {
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },

    /// Show the records of the children of a device path
    Listat {
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },

    /// Run a manifest against one or more device paths
    #[command(alias = "r")]
    Run {
        #[arg(value_name = "MANIFEST")]
        manifest: String,

        /// Device paths; several paths start a multiplexed job
        #[arg(value_name = "CONTEXT")]
        contexts: Vec<String>,

        /// Print the raw job output once it ends
        #[arg(short = 'o', long = "output")]
        output: bool,
    },

    /// Interactive session over stdin
    #[command(alias = "sh")]
    Shell,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl From<&CommandLine> for Config {
    fn from(cmd: &CommandLine) -> Self {
        Self {
            manifest_dir: cmd.manifests.clone(),
            poll_interval: Duration::from_millis(cmd.interval.max(1)),
            no_banner: cmd.no_banner,
            quiet: cmd.quiet,
            disable_input: cmd.no_input,
            json: cmd.json,
        }
    }
}

/// Discovers the local host and wraps it in a controller.
pub fn open_controller(cfg: &Config) -> anyhow::Result<Controller> {
    let localhost = LocalHost::discover(Box::new(SystemRepo), Box::new(SystemSpawner))
        .context("failed to inspect the local host")?;
    let manifests = ManifestDir::new(&cfg.manifest_dir);
    Ok(Controller::new(localhost, Box::new(manifests)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
