// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Interactive shell
//!
//! One controller for the whole session, driven one line at a time from
//! stdin. A reader thread hands lines over a channel so the engine keeps
//! being polled while the user is typing; reports are printed as soon as
//! they come in.
//!
//! A failing command only prints its error. The session ends on `quit`
//! or when stdin closes.

use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use colored::*;
use lookout_common::config::Config;
use lookout_common::models::object::JobId;
use lookout_common::{error, info, success};
use lookout_core::controller::Controller;

use crate::commands::{browse, open_controller};
use crate::lprint;
use crate::terminal::{colors, format, print};

const HELP: &[(&str, &str)] = &[
    ("ls [PATH]", "list the children of a device"),
    ("stat [PATH]", "show one device"),
    ("listat [PATH]", "show the children of a device"),
    ("mk PATH NAME", "create a host or a port under PATH"),
    ("rm PATH", "delete a host or a port"),
    ("run MANIFEST [PATH]", "start a job"),
    ("mux MANIFEST PATH...", "start one job per path"),
    ("jobs [PATH]", "list the jobs scoped to a device"),
    ("info JOB", "show one job"),
    ("kill JOB [SIGNAL]", "signal a job, term by default"),
    ("read JOB", "print buffered output"),
    ("write JOB TEXT...", "send one line to the job"),
    ("drop JOB", "forget a finished job"),
    ("refresh", "rediscover the local interfaces"),
    ("quit", "leave the shell"),
];

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Ls(String),
    Stat(String),
    Listat(String),
    Mk { path: String, name: String },
    Rm(String),
    Run { manifest: String, path: String },
    Mux { manifest: String, paths: Vec<String> },
    Jobs(String),
    Info(JobId),
    Kill { job: JobId, signal: String },
    Read(JobId),
    Write { job: JobId, text: String },
    Drop(JobId),
    Refresh,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Self::Empty);
        };
        let args: Vec<&str> = words.collect();

        let path_or_root = |args: &[&str]| args.first().unwrap_or(&"/").to_string();
        let job_at = |idx: usize| -> Result<JobId, String> {
            let raw = args
                .get(idx)
                .ok_or_else(|| format!("{verb}: missing job id"))?;
            raw.parse().map_err(|_| format!("{verb}: not a job id: {raw}"))
        };
        let arg_at = |idx: usize, what: &str| -> Result<String, String> {
            args.get(idx)
                .map(|s| s.to_string())
                .ok_or_else(|| format!("{verb}: missing {what}"))
        };

        let cmd = match verb {
            "ls" => Self::Ls(path_or_root(&args)),
            "stat" => Self::Stat(path_or_root(&args)),
            "listat" => Self::Listat(path_or_root(&args)),
            "mk" => Self::Mk {
                path: arg_at(0, "path")?,
                name: arg_at(1, "name")?,
            },
            "rm" => Self::Rm(arg_at(0, "path")?),
            "run" => Self::Run {
                manifest: arg_at(0, "manifest")?,
                path: args.get(1).unwrap_or(&"/").to_string(),
            },
            "mux" => {
                let manifest = arg_at(0, "manifest")?;
                let paths: Vec<String> = args[1..].iter().map(|s| s.to_string()).collect();
                if paths.is_empty() {
                    return Err("mux: missing paths".to_string());
                }
                Self::Mux { manifest, paths }
            }
            "jobs" => Self::Jobs(path_or_root(&args)),
            "info" => Self::Info(job_at(0)?),
            "kill" => Self::Kill {
                job: job_at(0)?,
                signal: args.get(1).unwrap_or(&"term").to_string(),
            },
            "read" => Self::Read(job_at(0)?),
            "write" => {
                let job = job_at(0)?;
                if args.len() < 2 {
                    return Err("write: missing text".to_string());
                }
                Self::Write {
                    job,
                    text: args[1..].join(" "),
                }
            }
            "drop" => Self::Drop(job_at(0)?),
            "refresh" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(cmd)
    }
}

pub fn shell(cfg: &Config) -> anyhow::Result<()> {
    let mut controller = open_controller(cfg)?;
    let lines = spawn_reader();

    print::header("shell", cfg);
    info!("Type `help` for the list of commands");

    loop {
        match lines.recv_timeout(cfg.poll_interval) {
            Ok(line) => {
                drain_reports(&mut controller, cfg)?;
                match ShellCommand::parse(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(cmd) => {
                        if let Err(e) = execute(&mut controller, cmd, cfg) {
                            error!("{e:#}");
                        }
                    }
                    Err(msg) => error!("{}", msg),
                }
            }
            Err(RecvTimeoutError::Timeout) => drain_reports(&mut controller, cfg)?,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    success!("Leaving shell");
    Ok(())
}

fn spawn_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn drain_reports(controller: &mut Controller, cfg: &Config) -> anyhow::Result<()> {
    for report in controller.update() {
        format::print_report(&report, cfg)?;
    }
    Ok(())
}

fn execute(controller: &mut Controller, cmd: ShellCommand, cfg: &Config) -> anyhow::Result<()> {
    match cmd {
        ShellCommand::Ls(path) => browse::list_names(controller, &path, cfg)?,
        ShellCommand::Stat(path) => browse::show_stat(controller, &path, cfg)?,
        ShellCommand::Listat(path) => browse::show_listat(controller, &path, cfg)?,
        ShellCommand::Mk { path, name } => {
            controller.create(&path, &name)?;
            success!("Created {} under {}", name, path);
        }
        ShellCommand::Rm(path) => {
            controller.delete(&path)?;
            success!("Deleted {}", path);
        }
        ShellCommand::Run { manifest, path } => {
            let jid = controller.run(&manifest, &path)?;
            success!("Started job {}", jid);
        }
        ShellCommand::Mux { manifest, paths } => {
            let jid = controller.run_mux(&manifest, &paths)?;
            success!("Started job {} over {} contexts", jid, paths.len());
        }
        ShellCommand::Jobs(path) => {
            for jid in controller.jobs(&path)? {
                let info = controller.info(jid)?;
                if cfg.json {
                    format::print_job(&info, cfg)?;
                } else {
                    lprint!("{}", format::job_line(&info).color(colors::TEXT_DEFAULT));
                }
            }
        }
        ShellCommand::Info(jid) => format::print_job(&controller.info(jid)?, cfg)?,
        ShellCommand::Kill { job, signal } => {
            controller.signal(job, &signal)?;
            info!("Sent {} to job {}", signal, job);
        }
        ShellCommand::Read(jid) => {
            for line in controller.read(jid)?.lines() {
                lprint!("{}", line);
            }
        }
        ShellCommand::Write { job, text } => {
            controller.write(job, format!("{text}\n").as_bytes())?;
        }
        ShellCommand::Drop(jid) => {
            controller.drop_job(jid)?;
            info!("Dropped job {}", jid);
        }
        ShellCommand::Refresh => {
            for report in controller.refresh()? {
                format::print_report(&report, cfg)?;
            }
            success!("Interfaces refreshed");
        }
        ShellCommand::Help => {
            let width = HELP.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
            for (usage, text) in HELP {
                lprint!(
                    "  {}  {}",
                    format!("{usage:<width$}").color(colors::PRIMARY),
                    text.color(colors::TEXT_DEFAULT)
                );
            }
        }
        ShellCommand::Quit | ShellCommand::Empty => {}
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
