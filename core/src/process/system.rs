// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::io::{self, Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use lookout_common::debug;

use super::{CommandSpec, ExitState, Output, Process, Signal, Spawner};

const READ_CHUNK: usize = 4096;

/// Launches jobs as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn Process>> {
        let mut child: Child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout: ChildStdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let (out_tx, out_rx) = mpsc::channel();
        spawn_reader(stdout, out_tx);

        let input: Option<Sender<Vec<u8>>> = child.stdin.take().map(|stdin| {
            let (in_tx, in_rx) = mpsc::channel();
            spawn_writer(stdin, in_rx);
            in_tx
        });

        debug!(verbosity = 2, "Spawned `{}` as pid {}", spec, child.id());

        Ok(Box::new(ChildProcess {
            child,
            output: out_rx,
            input,
            eof: false,
            exit: None,
        }))
    }
}

/// Forwards stdout chunks until EOF. Dropping the sender marks EOF.
fn spawn_reader(mut stdout: ChildStdout, tx: Sender<Vec<u8>>) {
    thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stdout.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

fn spawn_writer(mut stdin: ChildStdin, rx: Receiver<Vec<u8>>) {
    thread::spawn(move || {
        for chunk in rx {
            if stdin.write_all(&chunk).and_then(|_| stdin.flush()).is_err() {
                break;
            }
        }
    });
}

struct ChildProcess {
    child: Child,
    output: Receiver<Vec<u8>>,
    input: Option<Sender<Vec<u8>>>,
    eof: bool,
    exit: Option<ExitState>,
}

impl Process for ChildProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn poll_output(&mut self) -> Output {
        let mut out = Output::default();
        if self.eof {
            out.eof = true;
            return out;
        }

        loop {
            match self.output.try_recv() {
                Ok(chunk) => out.data.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.eof = true;
                    break;
                }
            }
        }
        out.eof = self.eof;
        out
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        input
            .send(data.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn signal(&mut self, signal: Signal) -> io::Result<()> {
        if self.exit.is_some() {
            return Ok(());
        }
        let pid = libc::pid_t::try_from(self.child.id())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        // SAFETY: kill(2) only takes plain integers.
        let rc = unsafe { libc::kill(pid, signal.number()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitState>> {
        if self.exit.is_none()
            && let Some(status) = self.child.try_wait()?
        {
            self.exit = match (status.code(), status.signal()) {
                (Some(code), _) => Some(ExitState::Exited(code)),
                (None, Some(sig)) => Some(ExitState::Signaled(sig)),
                (None, None) => Some(ExitState::Exited(-1)),
            };
            self.input = None;
        }
        Ok(self.exit)
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.exit.is_none() && matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
