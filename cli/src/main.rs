// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Lookout CLI Entry Point
//!
//! Bootstraps logging, turns the command line into a [`Config`] and hands
//! control to one of the modules in `commands/`.
//!
//! This is also the error boundary of the whole program: whatever a command
//! returns as an error is logged here and turned into a non-zero `ExitCode`.

mod commands;
mod terminal;

use std::process::ExitCode;

use lookout_common::{config::Config, error};

use crate::{
    commands::{CommandLine, Commands, browse, info, run, shell},
    terminal::{print, spinner},
};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    spinner::init_logging(commands.verbosity);

    let cfg = Config::from(&commands);
    print::banner(&cfg);

    let result = match &commands.command {
        Commands::Info => info::info(&cfg),
        Commands::Ls { path } => browse::ls(path, &cfg),
        Commands::Stat { path } => browse::stat(path, &cfg),
        Commands::Listat { path } => browse::listat(path, &cfg),
        Commands::Run {
            manifest,
            contexts,
            output,
        } => run::run(manifest, contexts, *output, &cfg).await,
        Commands::Shell => shell::shell(&cfg),
    };

    let exit_code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical failure: {e:#}");
            ExitCode::FAILURE
        }
    };

    print::end_of_program(&cfg);

    exit_code
}
