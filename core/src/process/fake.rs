// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! A scripted [`Spawner`] for unit tests.
//!
//! Every spawned process is backed by shared state that the test drives
//! through a [`FakeHandle`]: push output, close stdout, make it exit, and
//! inspect what the engine wrote or which signals it sent.

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use super::{CommandSpec, ExitState, Output, Process, Signal, Spawner};

#[derive(Debug, Default)]
struct ProcState {
    pid: u32,
    spec: Option<CommandSpec>,
    pending: Vec<u8>,
    eof: bool,
    exit: Option<ExitState>,
    written: Vec<u8>,
    signals: Vec<Signal>,
}

#[derive(Debug, Default)]
struct SpawnerState {
    next_pid: u32,
    failing: HashSet<String>,
    fail_after: Option<usize>,
    procs: Vec<Arc<Mutex<ProcState>>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    state: Arc<Mutex<SpawnerState>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later spawn of `program` fails with `NotFound`.
    pub fn fail(&self, program: &str) {
        self.state.lock().unwrap().failing.insert(program.to_string());
    }

    /// Spawns fail once `count` processes were started.
    pub fn fail_after(&self, count: usize) {
        self.state.lock().unwrap().fail_after = Some(count);
    }

    pub fn spawned(&self) -> usize {
        self.state.lock().unwrap().procs.len()
    }

    /// The `index`-th successfully spawned process.
    pub fn handle(&self, index: usize) -> FakeHandle {
        FakeHandle(self.state.lock().unwrap().procs[index].clone())
    }

    pub fn last(&self) -> FakeHandle {
        let count = self.spawned();
        self.handle(count - 1)
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn Process>> {
        let mut state = self.state.lock().unwrap();
        let exhausted = state.fail_after.is_some_and(|n| state.procs.len() >= n);
        if exhausted || state.failing.contains(&spec.program) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        state.next_pid += 1;
        let proc = Arc::new(Mutex::new(ProcState {
            pid: 1000 + state.next_pid,
            spec: Some(spec.clone()),
            ..ProcState::default()
        }));
        state.procs.push(proc.clone());
        Ok(Box::new(FakeProcess(proc)))
    }
}

#[derive(Debug, Clone)]
pub struct FakeHandle(Arc<Mutex<ProcState>>);

impl FakeHandle {
    pub fn emit(&self, text: &str) {
        self.0.lock().unwrap().pending.extend_from_slice(text.as_bytes());
    }

    pub fn close(&self) {
        self.0.lock().unwrap().eof = true;
    }

    /// Exits with `code` and closes stdout.
    pub fn finish(&self, code: i32) {
        let mut state = self.0.lock().unwrap();
        state.exit = Some(ExitState::Exited(code));
        state.eof = true;
    }

    /// Exits without closing stdout, like a child whose grandchild holds the pipe.
    pub fn exit_only(&self, exit: ExitState) {
        self.0.lock().unwrap().exit = Some(exit);
    }

    pub fn pid(&self) -> u32 {
        self.0.lock().unwrap().pid
    }

    pub fn spec(&self) -> CommandSpec {
        self.0.lock().unwrap().spec.clone().unwrap()
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().written.clone()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.0.lock().unwrap().signals.clone()
    }
}

struct FakeProcess(Arc<Mutex<ProcState>>);

impl Process for FakeProcess {
    fn pid(&self) -> u32 {
        self.0.lock().unwrap().pid
    }

    fn poll_output(&mut self) -> Output {
        let mut state = self.0.lock().unwrap();
        Output {
            data: std::mem::take(&mut state.pending),
            eof: state.eof,
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.0.lock().unwrap();
        if state.exit.is_some() {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    /// Records the signal. `kill` and `term` also end the process.
    fn signal(&mut self, signal: Signal) -> io::Result<()> {
        let mut state = self.0.lock().unwrap();
        state.signals.push(signal);
        if state.exit.is_none() && matches!(signal, Signal::Kill | Signal::Term) {
            state.exit = Some(ExitState::Signaled(match signal {
                Signal::Kill => 9,
                _ => 15,
            }));
            state.eof = true;
        }
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitState>> {
        Ok(self.0.lock().unwrap().exit)
    }
}
