// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Process Capability
//!
//! The engine never blocks on a subprocess. Everything it needs from the
//! operating system is behind two small traits:
//!
//! * [`Spawner`] launches a program and hands back a [`Process`].
//! * [`Process`] offers non-blocking reads, best-effort writes, fire-and-forget
//!   signals and a non-blocking exit check.
//!
//! [`SystemSpawner`] is the real implementation. Tests use a scripted fake.

#[cfg(test)]
pub mod fake;
#[cfg(unix)]
mod system;

#[cfg(unix)]
pub use system::SystemSpawner;

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

/// Signals a job may receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Term,
    Kill,
    Int,
    Hup,
    Quit,
    Stop,
    Cont,
    Usr1,
    Usr2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no such signal: {0}")]
pub struct UnknownSignal(pub String);

impl Signal {
    pub const ALL: [Signal; 9] = [
        Signal::Term,
        Signal::Kill,
        Signal::Int,
        Signal::Hup,
        Signal::Quit,
        Signal::Stop,
        Signal::Cont,
        Signal::Usr1,
        Signal::Usr2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Term => "term",
            Signal::Kill => "kill",
            Signal::Int => "int",
            Signal::Hup => "hup",
            Signal::Quit => "quit",
            Signal::Stop => "stop",
            Signal::Cont => "cont",
            Signal::Usr1 => "usr1",
            Signal::Usr2 => "usr2",
        }
    }

    #[cfg(unix)]
    pub fn number(&self) -> i32 {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
            Signal::Int => libc::SIGINT,
            Signal::Hup => libc::SIGHUP,
            Signal::Quit => libc::SIGQUIT,
            Signal::Stop => libc::SIGSTOP,
            Signal::Cont => libc::SIGCONT,
            Signal::Usr1 => libc::SIGUSR1,
            Signal::Usr2 => libc::SIGUSR2,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG{}", self.name().to_ascii_uppercase())
    }
}

impl FromStr for Signal {
    type Err = UnknownSignal;

    /// Accepts `term`, `TERM`, `sigterm` and `SIGTERM` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let bare = lower.strip_prefix("sig").unwrap_or(&lower);

        Signal::ALL
            .into_iter()
            .find(|sig| sig.name() == bare)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}

/// Program and arguments of a job, placeholders already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Exited(i32),
    Signaled(i32),
}

/// Output collected by one [`Process::poll_output`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub data: Vec<u8>,
    /// Standard output was closed, nothing more will arrive.
    pub eof: bool,
}

pub trait Process {
    fn pid(&self) -> u32;

    /// Returns whatever output arrived since the last call. Never blocks.
    fn poll_output(&mut self) -> Output;

    /// Queues bytes for the process's standard input.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    fn signal(&mut self, signal: Signal) -> io::Result<()>;

    /// Returns the exit state once the process is gone. Never blocks.
    fn try_wait(&mut self) -> io::Result<Option<ExitState>>;
}

pub trait Spawner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn Process>>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
