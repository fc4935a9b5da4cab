// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Controller
//!
//! The path-addressed API clients talk to. Every call resolves its path
//! against the [`LocalHost`] it wraps, then reads or mutates the topology or
//! the job registry. Results are plain records from [`crate::stat`], so
//! nothing handed out borrows from the graph.
//!
//! Paths look like `/iface[/host[/proto[/port]]]`, see [`crate::path`].

use lookout_common::error::TopologyError;
use lookout_common::manifest::ManifestStore;
use lookout_common::models::event::Event;
use lookout_common::models::host::Host;
use lookout_common::models::object::{Context, JobId, ObjectRef};
use lookout_common::models::port::{Port, Protocol};
use lookout_common::utils::ip;
use lookout_common::{debug, info};

use crate::error::{ControllerError, JobError};
use crate::job::{Job, Runnable};
use crate::localhost::{Lineage, LocalHost};
use crate::muxjob::MuxJob;
use crate::path::{self, Pstat};
use crate::stat::{JobInfo, Report, Stat};

pub struct Controller {
    localhost: LocalHost,
    manifests: Box<dyn ManifestStore>,
}

impl Controller {
    pub fn new(localhost: LocalHost, manifests: Box<dyn ManifestStore>) -> Self {
        Self {
            localhost,
            manifests,
        }
    }

    pub fn localhost(&self) -> &LocalHost {
        &self.localhost
    }

    /// The path of a live object, `None` once it left the topology.
    pub fn path_of(&self, obj: ObjectRef) -> Option<String> {
        self.localhost.find_parents(obj).map(|lineage| lineage.path())
    }

    fn resolve(&self, path: &str) -> Result<Pstat<'_>, ControllerError> {
        Ok(path::resolve(&self.localhost, path)?)
    }

    // ---------------------------------------------------------------------
    // Topology
    // ---------------------------------------------------------------------

    /// Names of the children of `path`.
    ///
    /// A host lists its protocols, a protocol its port numbers, and a port
    /// has no children.
    pub fn list(&self, path: &str) -> Result<Vec<String>, ControllerError> {
        let pstat = self.resolve(path)?;

        let names = match (pstat.interface, pstat.host, pstat.proto, pstat.port) {
            (None, ..) => self
                .localhost
                .interfaces()
                .iter()
                .map(|i| i.name().to_string())
                .collect(),
            (Some(interface), None, ..) => {
                interface.hosts().keys().map(ToString::to_string).collect()
            }
            (_, Some(_), None, _) => Protocol::ALL.iter().map(ToString::to_string).collect(),
            (_, Some(host), Some(proto), None) => {
                host.ports(proto).keys().map(ToString::to_string).collect()
            }
            (.., Some(_)) => Vec::new(),
        };
        Ok(names)
    }

    pub fn stat(&self, path: &str) -> Result<Stat, ControllerError> {
        let pstat = self.resolve(path)?;

        let stat = if let Some(port) = pstat.port {
            Stat::from(port)
        } else if let Some(proto) = pstat.proto {
            Stat::from(proto)
        } else if let Some(host) = pstat.host {
            Stat::from(host)
        } else if let Some(interface) = pstat.interface {
            Stat::from(interface)
        } else {
            Stat::from(&self.localhost)
        };
        Ok(stat)
    }

    /// Stat records of the children of `path`.
    ///
    /// Unlike [`list`](Self::list), a host yields its ports of every
    /// protocol rather than the protocol names.
    pub fn listat(&self, path: &str) -> Result<Vec<Stat>, ControllerError> {
        let pstat = self.resolve(path)?;

        let stats = match (pstat.interface, pstat.host, pstat.proto, pstat.port) {
            (None, ..) => self.localhost.interfaces().iter().map(Stat::from).collect(),
            (Some(interface), None, ..) => interface.hosts().values().map(Stat::from).collect(),
            (_, Some(host), None, _) => host.all_ports().map(Stat::from).collect(),
            (_, Some(host), Some(proto), None) => {
                host.ports(proto).values().map(Stat::from).collect()
            }
            (.., Some(_)) => Vec::new(),
        };
        Ok(stats)
    }

    /// Creates a host under an interface (`name` is its ip) or a port under
    /// a protocol (`name` is its number).
    pub fn create(&mut self, path: &str, name: &str) -> Result<(), ControllerError> {
        let pstat = self.resolve(path)?;
        let Some(interface) = pstat.interface else {
            return Err(ControllerError::NotCreatable("interface"));
        };
        let parent = Lineage {
            interface,
            host: pstat.host,
            port: pstat.port,
        }
        .path();
        let interface = interface.name().to_string();

        match (pstat.host, pstat.proto, pstat.port) {
            (_, _, Some(_)) => Err(ControllerError::NotCreatable("subdevice to port")),
            (Some(_), None, None) => Err(ControllerError::NotCreatable("transport protocol")),
            (Some(host), Some(proto), None) => {
                let ip = host.ip();
                let invalid = || ControllerError::InvalidPort {
                    proto,
                    name: name.to_string(),
                };
                let number: i64 = name.trim().parse().map_err(|_| invalid())?;
                let port = Port::with_protocol(number, proto).map_err(|_| invalid())?;
                let device = format!("{parent}/{proto}/{}", port.number());

                let host = self.host_mut(&interface, ip)?;
                match host.add_port(port) {
                    Ok(_) => {}
                    Err(TopologyError::Duplicate(_)) => {
                        return Err(ControllerError::PortExists(device));
                    }
                    Err(e) => return Err(e.into()),
                }
                info!("Created {}", device);
                Ok(())
            }
            (None, ..) => {
                let addr = ip::parse_dotted_quad(name)
                    .ok_or_else(|| ControllerError::InvalidAddress(name.to_string()))?;
                let device = format!("{parent}/{addr}");

                let iface = self
                    .localhost
                    .interface_mut(&interface)
                    .ok_or(TopologyError::Foreign("localhost"))?;
                match iface.add_host(Host::from_addr(addr)) {
                    Ok(_) => {}
                    Err(TopologyError::Duplicate(_)) => {
                        return Err(ControllerError::HostExists(device));
                    }
                    Err(e) => return Err(e.into()),
                }
                info!("Created {}", device);
                Ok(())
            }
        }
    }

    /// Deletes the host or port at `path`.
    ///
    /// Fails while any registered job runs against the device or below it.
    pub fn delete(&mut self, path: &str) -> Result<(), ControllerError> {
        let pstat = self.resolve(path)?;
        let Some(interface) = pstat.interface else {
            return Err(ControllerError::NotDroppable("localhost"));
        };
        let Some(host) = pstat.host else {
            return Err(ControllerError::NotDroppable("interface"));
        };
        if pstat.proto.is_some() && pstat.port.is_none() {
            return Err(ControllerError::NotDroppable("protocol"));
        }

        let device = Lineage {
            interface,
            host: Some(host),
            port: pstat.port,
        }
        .path();
        let target = pstat.port.map(Port::id).unwrap_or(host.id());
        if let Some(job) = self.localhost.jobs_referencing(target).first() {
            return Err(ControllerError::InUse { job: *job, device });
        }

        let (interface, ip, host_id) = (interface.name().to_string(), host.ip(), host.id());
        match pstat.port.map(Port::id) {
            Some(port_id) => {
                self.host_mut(&interface, ip)?.drop_port(port_id)?;
            }
            None => {
                self.localhost
                    .interface_mut(&interface)
                    .ok_or(TopologyError::Foreign("localhost"))?
                    .drop_host(host_id)?;
            }
        }
        info!("Deleted {}", device);
        Ok(())
    }

    fn host_mut(
        &mut self,
        interface: &str,
        ip: std::net::Ipv4Addr,
    ) -> Result<&mut Host, ControllerError> {
        self.localhost
            .interface_mut(interface)
            .and_then(|i| i.host_mut(ip))
            .ok_or(ControllerError::Topology(TopologyError::Foreign("interface")))
    }

    // ---------------------------------------------------------------------
    // Update cycle
    // ---------------------------------------------------------------------

    /// Runs one update cycle and reports every event with its device path.
    pub fn update(&mut self) -> Vec<Report> {
        let events = self.localhost.update();
        events.into_iter().map(|event| self.report(event)).collect()
    }

    /// Re-reads the system interfaces and reports what changed.
    pub fn refresh(&mut self) -> Result<Vec<Report>, ControllerError> {
        let events = self.localhost.refresh_interfaces()?;
        Ok(events.into_iter().map(|event| self.report(event)).collect())
    }

    fn report(&self, event: Event) -> Report {
        Report {
            kind: event.kind,
            job: event.job,
            device: event.object.and_then(|obj| self.path_of(obj)),
            at: event.at,
            fields: event.fields,
        }
    }

    // ---------------------------------------------------------------------
    // Jobs
    // ---------------------------------------------------------------------

    /// Jobs bound to the deepest entity in `path`, or the global jobs at the
    /// root. A protocol level scopes to its host.
    pub fn jobs(&self, path: &str) -> Result<Vec<JobId>, ControllerError> {
        let object = self.resolve(path)?.object();
        Ok(self.localhost.jobs_in_context(object)?)
    }

    pub fn info(&self, jid: JobId) -> Result<JobInfo, ControllerError> {
        let job = self.localhost.job(jid).ok_or(ControllerError::NoJob(jid))?;
        let context = job
            .context()
            .deepest()
            .and_then(|obj| self.path_of(obj))
            .unwrap_or_else(|| "/".to_string());

        Ok(JobInfo {
            id: jid,
            name: job.name().to_string(),
            state: job.state(),
            pid: job.pid(),
            return_code: job.return_code(),
            context,
            members: job.members(),
        })
    }

    fn job_mut(&mut self, jid: JobId) -> Result<&mut (dyn Runnable + 'static), ControllerError> {
        self.localhost
            .job_mut(jid)
            .ok_or(ControllerError::NoJob(jid))
    }

    pub fn signal(&mut self, jid: JobId, name: &str) -> Result<(), ControllerError> {
        self.job_mut(jid)?.signal(name)?;
        debug!("Sent {} to job {}", name, jid);
        Ok(())
    }

    /// Output lines collected since the last call. Call [`update`](Self::update)
    /// first, reading never polls the process.
    pub fn read(&mut self, jid: JobId) -> Result<String, ControllerError> {
        Ok(self.job_mut(jid)?.read())
    }

    pub fn write(&mut self, jid: JobId, data: &[u8]) -> Result<(), ControllerError> {
        Ok(self.job_mut(jid)?.write(data)?)
    }

    /// Starts manifest `name` against the entity at `context`.
    ///
    /// The manifest is looked up before anything else, so an unknown name
    /// never uses up a job id.
    pub fn run(&mut self, name: &str, context: &str) -> Result<JobId, ControllerError> {
        let manifest = self.manifests.load(name)?;
        let context = self.context_at(context)?;
        let job = Job::new(manifest, context)?;
        Ok(self.localhost.add_job(Box::new(job))?)
    }

    /// Starts manifest `name` once per context, grouped under a single id.
    pub fn run_mux<S: AsRef<str>>(
        &mut self,
        name: &str,
        contexts: &[S],
    ) -> Result<JobId, ControllerError> {
        let manifest = self.manifests.load(name)?;
        let contexts = contexts
            .iter()
            .map(|path| self.context_at(path.as_ref()))
            .collect::<Result<Vec<Context>, _>>()?;
        let job = MuxJob::new(manifest, &contexts).map_err(|err| match err {
            JobError::DuplicateContext { index } => {
                let path = contexts[index]
                    .deepest()
                    .and_then(|obj| self.path_of(obj))
                    .unwrap_or_else(|| "/".to_string());
                ControllerError::DuplicateContext(path)
            }
            other => other.into(),
        })?;
        Ok(self.localhost.add_job(Box::new(job))?)
    }

    fn context_at(&self, path: &str) -> Result<Context, ControllerError> {
        let object = self.resolve(path)?.object();
        Ok(self.localhost.context_of(object)?)
    }

    /// Forgets a job that is no longer running.
    pub fn drop_job(&mut self, jid: JobId) -> Result<(), ControllerError> {
        self.localhost.drop_job(jid)?;
        Ok(())
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
