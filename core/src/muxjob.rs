// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Multiplexed Jobs
//!
//! One manifest fanned out over several contexts, registered and addressed as
//! a single job. Members are independent processes: launching and signalling
//! are best effort, failures are collected per member and nothing already
//! done on other members is rolled back.

use std::collections::HashSet;
use std::sync::Arc;

use lookout_common::manifest::Manifest;
use lookout_common::models::event::Event;
use lookout_common::models::object::{Context, JobId};
use lookout_common::warn;

use crate::error::JobError;
use crate::job::{Binder, Job, JobState, Runnable};
use crate::process::{Signal, Spawner};

#[derive(Debug)]
pub struct MuxJob {
    id: Option<JobId>,
    name: String,
    common: Context,
    jobs: Vec<Job>,
}

impl MuxJob {
    /// Builds one member per context.
    ///
    /// Fails as a whole if any context is wrong for the manifest or repeats
    /// an earlier one. Nothing has been launched at that point, so no member
    /// is left behind.
    pub fn new(manifest: Arc<Manifest>, contexts: &[Context]) -> Result<Self, JobError> {
        if contexts.is_empty() {
            return Err(JobError::NoContexts);
        }

        let mut seen: HashSet<Context> = HashSet::with_capacity(contexts.len());
        if let Some(index) = contexts.iter().position(|ctx| !seen.insert(*ctx)) {
            return Err(JobError::DuplicateContext { index });
        }

        let jobs = contexts
            .iter()
            .map(|ctx| Job::new(manifest.clone(), *ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: None,
            name: manifest.name().to_string(),
            common: Context::common(contexts),
            jobs,
        })
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    fn collect<F>(&mut self, mut op: F) -> Result<(), JobError>
    where
        F: FnMut(&mut Job) -> Result<(), JobError>,
    {
        let failures: Vec<(usize, JobError)> = self
            .jobs
            .iter_mut()
            .enumerate()
            .filter_map(|(index, job)| op(job).err().map(|err| (index, err)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(JobError::Members(failures))
        }
    }
}

impl Runnable for MuxJob {
    fn id(&self) -> Option<JobId> {
        self.id
    }

    fn assign_id(&mut self, id: JobId) {
        self.id = Some(id);
        for job in &mut self.jobs {
            job.assign_id(id);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn context(&self) -> Context {
        self.common
    }

    fn contexts(&self) -> Vec<Context> {
        self.jobs.iter().map(Runnable::context).collect()
    }

    fn run(&mut self, spawner: &dyn Spawner, bind: Binder<'_>) -> Result<(), JobError> {
        let result = self.collect(|job| job.run(spawner, bind));
        if let Err(JobError::Members(failures)) = &result {
            warn!(
                "{} of {} members of job {} failed to launch",
                failures.len(),
                self.jobs.len(),
                self.id.unwrap_or_default()
            );
        }
        result
    }

    fn update(&mut self) -> Vec<Event> {
        self.jobs.iter_mut().flat_map(|job| job.update()).collect()
    }

    /// Members only ever hand out whole lines, so no line is split.
    fn read(&mut self) -> String {
        self.jobs.iter_mut().map(|job| job.read()).collect()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), JobError> {
        self.collect(|job| match job.state() {
            JobState::Init => Ok(()),
            _ => job.write(data),
        })
    }

    /// The name is checked once, before any member is signalled.
    fn signal(&mut self, name: &str) -> Result<(), JobError> {
        let signal: Signal = name
            .parse()
            .map_err(|_| JobError::Signal(name.to_string()))?;

        self.collect(|job| match job.state() {
            JobState::Init => Ok(()),
            _ => job.send(signal),
        })
    }

    fn is_running(&self) -> bool {
        self.jobs.iter().any(Job::is_running)
    }

    /// Running while any member runs. Members that never launched do not
    /// keep the group alive.
    fn state(&self) -> JobState {
        let states: Vec<JobState> = self.jobs.iter().map(Job::state).collect();

        if states.contains(&JobState::Running) {
            JobState::Running
        } else if states.iter().all(|s| *s == JobState::Init) {
            JobState::Init
        } else if states.contains(&JobState::Terminated) {
            JobState::Terminated
        } else {
            JobState::Exited
        }
    }

    fn pid(&self) -> Option<u32> {
        None
    }

    /// The first non-zero member code, zero when every member succeeded.
    fn return_code(&self) -> Option<i32> {
        if !self.state().is_terminal() {
            return None;
        }
        let codes: Vec<i32> = self.jobs.iter().filter_map(Job::return_code).collect();
        codes
            .iter()
            .copied()
            .find(|code| *code != 0)
            .or(codes.first().copied())
    }

    fn members(&self) -> usize {
        self.jobs.len()
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
    use lookout_common::manifest::Bindings;
    use lookout_common::models::object::ObjectId;

    const PING: &str = r#"
        command = "ping"
        args = ["{host}"]
        contexts = ["host"]

        [[rules]]
        pattern = '^alive (?P<ip>\S+)$'
        event = "host"
    "#;

    fn manifest() -> Arc<Manifest> {
        Arc::new(Manifest::parse("ping", PING).unwrap())
    }

    fn host_ctx(interface: ObjectId) -> Context {
        Context {
            interface: Some(interface),
            host: Some(ObjectId::next()),
            port: None,
        }
    }

    fn bind(_: &Context) -> Bindings {
        let mut b = Bindings::new();
        b.insert("host", "10.0.0.1".to_string());
        b
    }

    fn running_mux(spawner: &FakeSpawner, members: usize) -> MuxJob {
        let iface = ObjectId::next();
        let contexts: Vec<Context> = (0..members).map(|_| host_ctx(iface)).collect();
        let mut mux = MuxJob::new(manifest(), &contexts).unwrap();
        mux.assign_id(JobId(3));
        mux.run(spawner, &bind).unwrap();
        mux
    }

    #[test]
    fn construction_is_all_or_nothing() {
        let iface = ObjectId::next();
        let contexts = [
            host_ctx(iface),
            Context {
                interface: Some(iface),
                host: None,
                port: None,
            },
        ];
        assert!(matches!(MuxJob::new(manifest(), &contexts), Err(JobError::Context { .. })));
        assert!(matches!(MuxJob::new(manifest(), &[]), Err(JobError::NoContexts)));
    }

    #[test]
    fn repeated_contexts_are_refused() {
        let iface = ObjectId::next();
        let (a, b) = (host_ctx(iface), host_ctx(iface));
        assert!(matches!(
            MuxJob::new(manifest(), &[a, b, a]),
            Err(JobError::DuplicateContext { index: 2 })
        ));
    }

    #[test]
    fn common_context_is_the_shared_interface() {
        let iface = ObjectId::next();
        let mux = MuxJob::new(manifest(), &[host_ctx(iface), host_ctx(iface)]).unwrap();
        assert_eq!(mux.context().interface, Some(iface));
        assert_eq!(mux.context().host, None);
        assert_eq!(mux.members(), 2);
    }

    #[test]
    fn read_never_splices_lines_across_members() {
        let spawner = FakeSpawner::new();
        let mut mux = running_mux(&spawner, 2);
        let (a, b) = (spawner.handle(0), spawner.handle(1));

        a.emit("alive 10.0.0.1\nalive 10.0.");
        b.emit("alive 10.0.0.2\n");
        let events = mux.update();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.job == JobId(3)));

        b.emit("partial");
        a.emit("0.3\n");
        mux.update();

        let text = mux.read();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["alive 10.0.0.1", "alive 10.0.0.2", "alive 10.0.0.3"]);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn launch_is_best_effort() {
        let spawner = FakeSpawner::new();
        spawner.fail_after(1);
        let iface = ObjectId::next();
        let contexts = [host_ctx(iface), host_ctx(iface), host_ctx(iface)];
        let mut mux = MuxJob::new(manifest(), &contexts).unwrap();

        match mux.run(&spawner, &bind) {
            Err(JobError::Members(failures)) => {
                let failed: Vec<usize> = failures.iter().map(|(i, _)| *i).collect();
                assert_eq!(failed, vec![1, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(spawner.spawned(), 1);
        assert!(mux.is_running());

        spawner.handle(0).finish(0);
        mux.update();
        assert_eq!(mux.state(), JobState::Exited);
        assert_eq!(mux.return_code(), Some(0));
    }

    #[test]
    fn nothing_launched_stays_init() {
        let spawner = FakeSpawner::new();
        spawner.fail("ping");
        let iface = ObjectId::next();
        let mut mux = MuxJob::new(manifest(), &[host_ctx(iface), host_ctx(iface)]).unwrap();

        assert!(matches!(mux.run(&spawner, &bind), Err(JobError::Members(f)) if f.len() == 2));
        assert_eq!(mux.state(), JobState::Init);
        assert!(!mux.is_running());
    }

    #[test]
    fn bogus_signal_reaches_no_member() {
        let spawner = FakeSpawner::new();
        let mut mux = running_mux(&spawner, 2);

        assert!(matches!(mux.signal("bogus"), Err(JobError::Signal(_))));
        assert!(spawner.handle(0).signals().is_empty());
        assert!(spawner.handle(1).signals().is_empty());
        assert!(mux.is_running());
    }

    #[test]
    fn running_until_the_last_member_ends() {
        let spawner = FakeSpawner::new();
        let mut mux = running_mux(&spawner, 2);

        spawner.handle(0).finish(0);
        mux.update();
        assert!(mux.is_running());
        assert_eq!(mux.return_code(), None);

        mux.signal("term").unwrap();
        assert_eq!(spawner.handle(1).signals(), vec![Signal::Term]);
        assert!(spawner.handle(0).signals().is_empty());

        mux.update();
        assert!(!mux.is_running());
        assert_eq!(mux.state(), JobState::Terminated);
        assert_eq!(mux.return_code(), Some(-15));
    }

    #[test]
    fn write_is_broadcast() {
        let spawner = FakeSpawner::new();
        let mut mux = running_mux(&spawner, 3);
        mux.write(b"go\n").unwrap();
        for i in 0..3 {
            assert_eq!(spawner.handle(i).written(), b"go\n");
        }
    }
}
