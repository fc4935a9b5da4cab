// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Jobs
//!
//! A [`Job`] drives one external process bound to a [`Context`] and turns its
//! output into [`Event`]s according to a [`Manifest`].
//!
//! ## Lifecycle
//! `init → running → {exited, terminated}`. Terminal states are final: once
//! reached, `update()` returns nothing and `write()`/`signal()` do nothing.
//!
//! ## Parsing
//! Output is split into `\n`-terminated records. Incomplete trailing data
//! stays buffered until the next `update()`, so a record is never parsed
//! from half a line. The trailing piece left when the process exits is
//! parsed as a final record.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use lookout_common::manifest::{Bindings, Manifest};
use lookout_common::models::event::{Event, EventKind};
use lookout_common::models::object::{Context, JobId};
use lookout_common::{debug, info, warn};

use crate::error::JobError;
use crate::process::{CommandSpec, ExitState, Process, Signal, Spawner};

/// Computes the placeholder values for a context.
pub type Binder<'a> = &'a dyn Fn(&Context) -> Bindings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Init,
    Running,
    Exited,
    Terminated,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Exited | JobState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Init => "init",
            JobState::Running => "running",
            JobState::Exited => "exited",
            JobState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the local host can keep in its job registry.
pub trait Runnable {
    fn id(&self) -> Option<JobId>;

    /// Called once by the registry before the job runs.
    fn assign_id(&mut self, id: JobId);

    /// Manifest name.
    fn name(&self) -> &str;

    /// The context the job is addressed by.
    fn context(&self) -> Context;

    /// Every context a process of this job runs in.
    fn contexts(&self) -> Vec<Context>;

    fn run(&mut self, spawner: &dyn Spawner, bind: Binder<'_>) -> Result<(), JobError>;

    fn update(&mut self) -> Vec<Event>;

    /// Takes the complete output lines collected by previous `update()` calls.
    fn read(&mut self) -> String;

    fn write(&mut self, data: &[u8]) -> Result<(), JobError>;

    fn signal(&mut self, name: &str) -> Result<(), JobError>;

    fn is_running(&self) -> bool;

    fn state(&self) -> JobState;

    fn pid(&self) -> Option<u32>;

    fn return_code(&self) -> Option<i32>;

    /// Number of processes behind this job.
    fn members(&self) -> usize;
}

/// Longest partial line kept while waiting for its newline.
pub const MAX_PARTIAL_LINE: usize = 64 * 1024;

pub struct Job {
    id: Option<JobId>,
    manifest: Arc<Manifest>,
    context: Context,
    process: Option<Box<dyn Process>>,
    pid: Option<u32>,
    state: JobState,
    exit: Option<ExitState>,
    pending: Vec<u8>,
    /// `pending[..scanned]` holds no newline.
    scanned: usize,
    unread: String,
    exit_seen: bool,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("manifest", &self.manifest.name())
            .field("context", &self.context)
            .field("pid", &self.pid)
            .field("state", &self.state)
            .finish()
    }
}

impl Job {
    /// Binds a manifest to a context. Fails if the manifest does not run there.
    pub fn new(manifest: Arc<Manifest>, context: Context) -> Result<Self, JobError> {
        let kind = context.kind();
        if !manifest.accepts(kind) {
            return Err(JobError::Context {
                manifest: manifest.name().to_string(),
                kind,
            });
        }

        Ok(Self {
            id: None,
            manifest,
            context,
            process: None,
            pid: None,
            state: JobState::Init,
            exit: None,
            pending: Vec::new(),
            scanned: 0,
            unread: String::new(),
            exit_seen: false,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Delivers an already parsed signal.
    pub(crate) fn send(&mut self, signal: Signal) -> Result<(), JobError> {
        match self.state {
            JobState::Init => Err(JobError::NotStarted),
            JobState::Exited | JobState::Terminated => Ok(()),
            JobState::Running => {
                let process = self.process.as_mut().ok_or(JobError::NotStarted)?;
                process.signal(signal)?;
                debug!("Sent {} to job {}", signal, self.job_id());
                Ok(())
            }
        }
    }

    fn job_id(&self) -> JobId {
        self.id.unwrap_or_default()
    }

    /// Parses every complete line in the buffer. A partial line longer than
    /// [`MAX_PARTIAL_LINE`] is recorded as it is.
    fn drain_lines(&mut self, events: &mut Vec<Event>) {
        let mut buf = std::mem::take(&mut self.pending);
        let mut start = 0;
        let mut cursor = self.scanned;

        while let Some(offset) = buf[cursor..].iter().position(|b| *b == b'\n') {
            let end = cursor + offset;
            let text = String::from_utf8_lossy(&buf[start..end]);
            self.record(&text, events);
            start = end + 1;
            cursor = start;
        }

        if buf.len() - start > MAX_PARTIAL_LINE {
            warn!(
                "Job {} wrote {} bytes without a newline",
                self.job_id(),
                buf.len() - start
            );
            let text = String::from_utf8_lossy(&buf[start..]);
            self.record(&text, events);
            start = buf.len();
        }

        buf.drain(..start);
        self.scanned = buf.len();
        self.pending = buf;
    }

    fn record(&mut self, line: &str, events: &mut Vec<Event>) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        self.unread.push_str(line);
        self.unread.push('\n');

        if let Some((kind, fields)) = self.manifest.match_line(line) {
            let mut event = Event::new(self.job_id(), kind, self.context);
            event.fields = fields;
            events.push(event);
        }
    }

    fn finish(&mut self, exit: ExitState, events: &mut Vec<Event>) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.scanned = 0;
            let text = String::from_utf8_lossy(&rest).into_owned();
            self.record(&text, events);
        }

        let mut event = Event::new(self.job_id(), EventKind::Exit, self.context);
        match exit {
            ExitState::Exited(code) => {
                self.state = JobState::Exited;
                event = event.with_field("return_code", code.to_string());
                info!("Job {} ({}) exited with code {}", self.job_id(), self.name(), code);
            }
            ExitState::Signaled(sig) => {
                self.state = JobState::Terminated;
                event = event
                    .with_field("return_code", (-sig).to_string())
                    .with_field("signal", sig.to_string());
                info!("Job {} ({}) terminated by signal {}", self.job_id(), self.name(), sig);
            }
        }
        events.push(event.with_field("state", self.state.as_str()));
        self.process = None;
    }
}

impl Runnable for Job {
    fn id(&self) -> Option<JobId> {
        self.id
    }

    fn assign_id(&mut self, id: JobId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        self.manifest.name()
    }

    fn context(&self) -> Context {
        self.context
    }

    fn contexts(&self) -> Vec<Context> {
        vec![self.context]
    }

    fn run(&mut self, spawner: &dyn Spawner, bind: Binder<'_>) -> Result<(), JobError> {
        if self.state != JobState::Init {
            return Err(JobError::AlreadyStarted);
        }

        let spec = CommandSpec {
            program: self.manifest.command().to_string(),
            args: self.manifest.render_args(&bind(&self.context)),
        };

        let process = spawner.spawn(&spec).map_err(|source| JobError::Launch {
            manifest: self.manifest.name().to_string(),
            source,
        })?;

        self.pid = Some(process.pid());
        self.process = Some(process);
        self.state = JobState::Running;
        debug!(verbosity = 1, "Job {} running `{}`", self.job_id(), spec);
        Ok(())
    }

    fn update(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != JobState::Running {
            return events;
        }
        let Some(process) = self.process.as_mut() else {
            return events;
        };

        let output = process.poll_output();
        if self.exit.is_none() {
            self.exit = process.try_wait().unwrap_or_else(|e| {
                warn!("Could not poll job {}: {}", self.id.unwrap_or_default(), e);
                None
            });
        }

        self.pending.extend_from_slice(&output.data);
        self.drain_lines(&mut events);

        // Output written just before exit may still be in flight, so the
        // terminal transition waits for EOF or for one more update.
        if let Some(exit) = self.exit {
            if output.eof || self.exit_seen {
                self.finish(exit, &mut events);
            } else {
                self.exit_seen = true;
            }
        }
        events
    }

    fn read(&mut self) -> String {
        std::mem::take(&mut self.unread)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), JobError> {
        match self.state {
            JobState::Init => Err(JobError::NotStarted),
            JobState::Exited | JobState::Terminated => Ok(()),
            JobState::Running => {
                let process = self.process.as_mut().ok_or(JobError::NotStarted)?;
                process.write(data)?;
                Ok(())
            }
        }
    }

    fn signal(&mut self, name: &str) -> Result<(), JobError> {
        let signal: Signal = name
            .parse()
            .map_err(|_| JobError::Signal(name.to_string()))?;
        self.send(signal)
    }

    fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    fn state(&self) -> JobState {
        self.state
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn return_code(&self) -> Option<i32> {
        if !self.state.is_terminal() {
            return None;
        }
        self.exit.map(|exit| match exit {
            ExitState::Exited(code) => code,
            ExitState::Signaled(sig) => -sig,
        })
    }

    fn members(&self) -> usize {
        1
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeSpawner;
    use lookout_common::models::object::{ContextKind, ObjectId};

    const SWEEP: &str = r#"
        command = "sweep"
        args = ["{interface}"]
        contexts = ["interface"]

        [[rules]]
        pattern = '^host (?P<ip>\S+)$'
        event = "host"
    "#;

    fn manifest() -> Arc<Manifest> {
        Arc::new(Manifest::parse("sweep", SWEEP).unwrap())
    }

    fn on_eth0() -> Context {
        Context {
            interface: Some(ObjectId::next()),
            host: None,
            port: None,
        }
    }

    fn no_bindings(_: &Context) -> Bindings {
        Bindings::new()
    }

    fn running_job(spawner: &FakeSpawner) -> Job {
        let mut job = Job::new(manifest(), on_eth0()).unwrap();
        job.assign_id(JobId(7));
        job.run(spawner, &no_bindings).unwrap();
        job
    }

    #[test]
    fn new_rejects_inapplicable_contexts() {
        let ctx = Context {
            interface: Some(ObjectId::next()),
            host: Some(ObjectId::next()),
            port: None,
        };
        let err = Job::new(manifest(), ctx).unwrap_err();
        assert!(matches!(err, JobError::Context { kind: ContextKind::Host, .. }));
    }

    #[test]
    fn run_renders_arguments_from_bindings() {
        let spawner = FakeSpawner::new();
        let mut job = Job::new(manifest(), on_eth0()).unwrap();
        let bind = |_: &Context| {
            let mut b = Bindings::new();
            b.insert("interface", "eth0".to_string());
            b
        };

        job.run(&spawner, &bind).unwrap();
        assert_eq!(job.state(), JobState::Running);
        assert_eq!(job.pid(), Some(spawner.last().pid()));
        assert_eq!(spawner.last().spec().args, vec!["eth0"]);
        assert!(matches!(job.run(&spawner, &bind), Err(JobError::AlreadyStarted)));
    }

    #[test]
    fn launch_failure_keeps_init() {
        let spawner = FakeSpawner::new();
        spawner.fail("sweep");
        let mut job = Job::new(manifest(), on_eth0()).unwrap();

        assert!(matches!(job.run(&spawner, &no_bindings), Err(JobError::Launch { .. })));
        assert_eq!(job.state(), JobState::Init);
        assert!(!job.is_running());
        assert!(matches!(job.write(b"x"), Err(JobError::NotStarted)));
    }

    #[test]
    fn partial_lines_wait_for_their_newline() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        let proc = spawner.last();

        proc.emit("host 10.0.");
        assert!(job.update().is_empty());
        assert_eq!(job.read(), "");

        proc.emit("0.5\r\nnoise\nhost 10.0.0.6\n");
        let events = job.update();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].job, JobId(7));
        assert_eq!(events[0].field("ip"), Some("10.0.0.5"));
        assert_eq!(events[1].field("ip"), Some("10.0.0.6"));
        assert_eq!(job.read(), "host 10.0.0.5\nnoise\nhost 10.0.0.6\n");
        assert_eq!(job.read(), "");
    }

    #[test]
    fn endless_lines_are_cut_at_the_limit() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        let proc = spawner.last();

        let chunk = "x".repeat(MAX_PARTIAL_LINE / 4);
        for _ in 0..4 {
            proc.emit(&chunk);
            assert!(job.update().is_empty());
            assert_eq!(job.read(), "");
        }

        proc.emit("y");
        job.update();
        let text = job.read();
        assert_eq!(text.len(), MAX_PARTIAL_LINE + 2);
        assert!(text.ends_with("xy\n"));

        proc.emit("host 10.0.0.5\n");
        let events = job.update();
        assert_eq!(events.len(), 1);
        assert_eq!(job.read(), "host 10.0.0.5\n");
    }

    #[test]
    fn lines_split_across_many_updates_are_joined() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        let proc = spawner.last();

        for piece in ["ho", "st ", "10.0", ".0.", "5"] {
            proc.emit(piece);
            assert!(job.update().is_empty());
        }
        proc.emit("\nhost 10.0.0.6\nho");
        let events = job.update();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].field("ip"), Some("10.0.0.5"));
        assert_eq!(job.read(), "host 10.0.0.5\nhost 10.0.0.6\n");

        proc.emit("st 10.0.0.7\n");
        assert_eq!(job.update()[0].field("ip"), Some("10.0.0.7"));
    }

    #[test]
    fn exit_is_reported_once_and_is_final() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        let proc = spawner.last();

        proc.emit("host 10.0.0.9");
        proc.finish(3);

        let events = job.update();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].field("ip"), Some("10.0.0.9"));
        assert_eq!(events[1].kind, EventKind::Exit);
        assert_eq!(events[1].field("return_code"), Some("3"));
        assert_eq!(events[1].field("state"), Some("exited"));

        assert_eq!(job.state(), JobState::Exited);
        assert_eq!(job.return_code(), Some(3));
        assert!(job.update().is_empty());
        assert!(job.write(b"ignored").is_ok());
        assert!(job.signal("term").is_ok());
        assert!(proc.signals().is_empty());
    }

    #[test]
    fn exit_without_eof_waits_one_more_update() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        let proc = spawner.last();

        proc.exit_only(ExitState::Exited(0));
        assert!(job.update().is_empty());
        assert!(job.is_running());

        proc.emit("host 10.0.0.1\n");
        let events = job.update();
        assert_eq!(events.len(), 2);
        assert_eq!(job.state(), JobState::Exited);
    }

    #[test]
    fn bogus_signal_keeps_the_job_running() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);

        let err = job.signal("bogus").unwrap_err();
        assert_eq!(err.to_string(), "no such signal: bogus");
        assert_eq!(job.state(), JobState::Running);
        assert!(spawner.last().signals().is_empty());
    }

    #[test]
    fn kill_ends_in_terminated_with_negative_code() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);

        job.signal("SIGKILL").unwrap();
        assert!(job.is_running());

        let events = job.update();
        assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Exit));
        assert_eq!(job.state(), JobState::Terminated);
        assert_eq!(job.return_code(), Some(-9));
        assert_eq!(spawner.last().signals(), vec![Signal::Kill]);
    }

    #[test]
    fn write_reaches_the_process() {
        let spawner = FakeSpawner::new();
        let mut job = running_job(&spawner);
        job.write(b"y\n").unwrap();
        assert_eq!(spawner.last().written(), b"y\n");
    }
}
