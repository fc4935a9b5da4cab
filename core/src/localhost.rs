// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Local Host
//!
//! Root of the topology. Owns every [`Interface`] (and through them every host
//! and port) plus the job registry, and runs the update cycle:
//!
//! 1. poll every registered job,
//! 2. apply the resulting events to the topology,
//! 3. hand the events back with `object` pointing at what they touched.
//!
//! All mutation goes through `&mut self`, so a single control thread drives
//! the whole graph. Callers sharing a `LocalHost` between threads have to
//! serialize access themselves.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use pnet::util::MacAddr;

use lookout_common::error::TopologyError;
use lookout_common::manifest::Bindings;
use lookout_common::models::event::{Event, EventKind};
use lookout_common::models::host::{Host, HostState};
use lookout_common::models::interface::{Interface, InterfaceConfig, LinkState};
use lookout_common::models::object::{Context, JobId, ObjectId, ObjectRef};
use lookout_common::models::port::{Port, PortState, Protocol};
use lookout_common::system::{Identity, SystemRepository};
use lookout_common::utils::ip;
use lookout_common::{debug, error, info, success, warn};

use crate::error::JobError;
use crate::job::{JobState, Runnable};
use crate::process::Spawner;

/// The chain of entities leading to one object, shallowest first.
#[derive(Debug, Clone, Copy)]
pub struct Lineage<'a> {
    pub interface: &'a Interface,
    pub host: Option<&'a Host>,
    pub port: Option<&'a Port>,
}

impl Lineage<'_> {
    pub fn context(&self) -> Context {
        Context {
            interface: Some(self.interface.id()),
            host: self.host.map(Host::id),
            port: self.port.map(Port::id),
        }
    }

    /// One segment per level: interface name, host ip, then protocol and number.
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.interface.name());
        if let Some(host) = self.host {
            path.push_str(&format!("/{}", host.ip()));
        }
        if let Some(port) = self.port {
            path.push_str(&format!("/{}/{}", port.protocol(), port.number()));
        }
        path
    }
}

pub struct LocalHost {
    username: String,
    hostname: String,
    interfaces: Vec<Interface>,
    jobs: BTreeMap<JobId, Box<dyn Runnable>>,
    spawner: Box<dyn Spawner>,
    system: Option<Box<dyn SystemRepository>>,
}

impl LocalHost {
    /// Resolves identity and interfaces through the system repository.
    pub fn discover(
        system: Box<dyn SystemRepository>,
        spawner: Box<dyn Spawner>,
    ) -> anyhow::Result<Self> {
        let identity = system.identity()?;
        let configs = system.interfaces()?;

        let mut localhost = Self::with_interfaces(identity, configs, spawner);
        localhost.system = Some(system);
        Ok(localhost)
    }

    /// Builds a local host from a fixed set of interfaces.
    ///
    /// Interfaces keep the given order. A repeated name is skipped.
    pub fn with_interfaces(
        identity: Identity,
        configs: Vec<InterfaceConfig>,
        spawner: Box<dyn Spawner>,
    ) -> Self {
        let mut interfaces: Vec<Interface> = Vec::with_capacity(configs.len());
        for config in configs {
            if interfaces.iter().any(|i| i.name() == config.name) {
                warn!("Ignoring duplicate interface {}", config.name);
                continue;
            }
            interfaces.push(Interface::new(config));
        }

        debug!(
            verbosity = 1,
            "Local host {}@{} with {} interfaces",
            identity.username,
            identity.hostname,
            interfaces.len()
        );

        Self {
            username: identity.username,
            hostname: identity.hostname,
            interfaces,
            jobs: BTreeMap::new(),
            spawner,
            system: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Interfaces in registration order.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name() == name)
    }

    // ---------------------------------------------------------------------
    // Graph navigation
    // ---------------------------------------------------------------------

    /// Returns the ancestors of `obj` together with the object itself, or
    /// `None` when the object is not part of this local host.
    pub fn find_parents(&self, obj: ObjectRef) -> Option<Lineage<'_>> {
        self.interfaces.iter().find_map(|interface| match obj {
            ObjectRef::Interface(id) => (interface.id() == id).then_some(Lineage {
                interface,
                host: None,
                port: None,
            }),
            ObjectRef::Host(id) => interface.find_host(id).map(|host| Lineage {
                interface,
                host: Some(host),
                port: None,
            }),
            ObjectRef::Port(id) => interface.hosts().values().find_map(|host| {
                host.find_port(id).map(|port| Lineage {
                    interface,
                    host: Some(host),
                    port: Some(port),
                })
            }),
        })
    }

    /// The full context for `obj`, global for `None`.
    pub fn context_of(&self, obj: Option<ObjectRef>) -> Result<Context, TopologyError> {
        match obj {
            None => Ok(Context::global()),
            Some(obj) => self
                .find_parents(obj)
                .map(|lineage| lineage.context())
                .ok_or(TopologyError::Foreign("localhost")),
        }
    }

    fn check_context(&self, ctx: &Context) -> Result<(), TopologyError> {
        if self.context_of(ctx.deepest())? != *ctx {
            return Err(TopologyError::Foreign("localhost"));
        }
        Ok(())
    }

    /// Placeholder values for a job running in `ctx`.
    pub fn bindings(&self, ctx: &Context) -> Bindings {
        let mut bindings = Bindings::new();
        let Some(lineage) = ctx.deepest().and_then(|obj| self.find_parents(obj)) else {
            return bindings;
        };

        let iface = lineage.interface;
        let text = |addr: Option<Ipv4Addr>| addr.map(|a| a.to_string()).unwrap_or_default();
        bindings.insert("interface", iface.name().to_string());
        bindings.insert("ip", text(iface.ip()));
        bindings.insert("mask", text(iface.mask()));
        bindings.insert("gateway", text(iface.gateway()));
        bindings.insert(
            "network",
            iface.network().map(|n| n.to_string()).unwrap_or_default(),
        );

        if let Some(host) = lineage.host {
            bindings.insert("host", host.ip().to_string());
        }
        if let Some(port) = lineage.port {
            bindings.insert("proto", port.protocol().to_string());
            bindings.insert("port", port.number().to_string());
        }
        bindings
    }

    // ---------------------------------------------------------------------
    // Job registry
    // ---------------------------------------------------------------------

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.keys().copied().collect()
    }

    pub fn job(&self, id: JobId) -> Option<&dyn Runnable> {
        self.jobs.get(&id).map(|job| job.as_ref())
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut (dyn Runnable + 'static)> {
        self.jobs.get_mut(&id).map(|job| job.as_mut())
    }

    fn next_job_id(&self) -> JobId {
        let mut candidate = 1;
        while self.jobs.contains_key(&JobId(candidate)) {
            candidate += 1;
        }
        JobId(candidate)
    }

    /// Registers a job under the smallest free id and runs it.
    ///
    /// A job that could not launch a single process is not kept. A
    /// multiplexed job with some members running is kept, and the member
    /// failures come back as [`JobError::PartialLaunch`].
    pub fn add_job(&mut self, mut job: Box<dyn Runnable>) -> Result<JobId, JobError> {
        for ctx in job.contexts() {
            self.check_context(&ctx)?;
        }

        let id = self.next_job_id();
        job.assign_id(id);

        let bind = |ctx: &Context| self.bindings(ctx);
        let launched = job.run(self.spawner.as_ref(), &bind);

        match launched {
            Ok(()) => {
                success!("Started job {} ({})", id, job.name());
                self.jobs.insert(id, job);
                Ok(id)
            }
            Err(err) if job.state() == JobState::Init => {
                error!("Job {} ({}) failed to start: {}", id, job.name(), err);
                Err(err)
            }
            Err(err) => {
                warn!("Job {} ({}) started with failures", id, job.name());
                self.jobs.insert(id, job);
                Err(JobError::PartialLaunch {
                    job: id,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Jobs whose context is exactly `obj`, or the global jobs for `None`.
    pub fn jobs_in_context(&self, obj: Option<ObjectRef>) -> Result<Vec<JobId>, TopologyError> {
        if let Some(obj) = obj
            && self.find_parents(obj).is_none()
        {
            return Err(TopologyError::Foreign("localhost"));
        }

        Ok(self
            .jobs
            .iter()
            .filter(|(_, job)| job.context().deepest() == obj)
            .map(|(id, _)| *id)
            .collect())
    }

    /// Jobs with any process running against `id` or something below it.
    pub fn jobs_referencing(&self, id: ObjectId) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|(_, job)| job.contexts().iter().any(|ctx| ctx.references(id)))
            .map(|(jid, _)| *jid)
            .collect()
    }

    /// Removes a job that is no longer running.
    pub fn drop_job(&mut self, id: JobId) -> Result<Box<dyn Runnable>, JobError> {
        let job = self.jobs.get(&id).ok_or(JobError::NotFound(id))?;
        if job.is_running() {
            return Err(JobError::Running);
        }
        let job = self.jobs.remove(&id).ok_or(JobError::NotFound(id))?;
        debug!("Dropped job {} ({})", id, job.name());
        Ok(job)
    }

    // ---------------------------------------------------------------------
    // Update cycle
    // ---------------------------------------------------------------------

    /// Polls every job and applies the collected events.
    ///
    /// Events of one job keep their order. Across jobs the order is whatever
    /// the registry iteration gives and should not be relied on.
    pub fn update(&mut self) -> Vec<Event> {
        let mut events: Vec<Event> = Vec::new();
        for job in self.jobs.values_mut() {
            events.extend(job.update());
        }

        for event in &mut events {
            let applied = match event.kind {
                EventKind::Host | EventKind::Os => self.apply_host(event),
                EventKind::Port => self.apply_port(event),
                EventKind::Notice | EventKind::Exit => continue,
            };

            match applied {
                Ok(obj) => event.object = Some(obj),
                Err(e) => warn!("Ignoring {} event of job {}: {}", event.kind, event.job, e),
            }
        }
        events
    }

    /// Finds the interface and address an event is about.
    fn locate_host(&self, event: &Event) -> anyhow::Result<(usize, Ipv4Addr)> {
        let context_host = event
            .context
            .host
            .and_then(|id| self.find_parents(ObjectRef::Host(id)))
            .and_then(|lineage| lineage.host);

        let ip = match event.field("ip") {
            Some(text) => ip::parse_dotted_quad(text)
                .ok_or_else(|| TopologyError::InvalidAddress(text.to_string()))?,
            None => context_host
                .map(Host::ip)
                .ok_or_else(|| anyhow!("no host address in event or context"))?,
        };

        let by_context = event
            .context
            .interface
            .and_then(|id| self.interfaces.iter().position(|i| i.id() == id));
        let by_name = || {
            event
                .field("interface")
                .and_then(|name| self.interfaces.iter().position(|i| i.name() == name))
        };
        let by_subnet = || self.interfaces.iter().position(|i| i.contains_addr(ip));

        let index = by_context
            .or_else(by_name)
            .or_else(by_subnet)
            .ok_or_else(|| anyhow!("no interface reaches {ip}"))?;
        Ok((index, ip))
    }

    /// Returns the host at `ip`, creating it when it is new.
    fn host_entry(&mut self, index: usize, ip: Ipv4Addr) -> anyhow::Result<&mut Host> {
        let interface = &mut self.interfaces[index];
        if interface.host(ip).is_none() {
            interface.add_host(Host::from_addr(ip))?;
            info!("Discovered host {} on {}", ip, interface.name());
        }
        interface
            .host_mut(ip)
            .ok_or_else(|| anyhow!("host {ip} vanished"))
    }

    fn apply_host(&mut self, event: &Event) -> anyhow::Result<ObjectRef> {
        let (index, ip) = self.locate_host(event)?;
        let host = self.host_entry(index, ip)?;
        host.last_activity = Some(event.at);

        if event.kind == EventKind::Os {
            match event.field("os") {
                Some(os) => host.os = Some(os.to_string()),
                None => bail!("os event without an `os` field"),
            }
            return Ok(ObjectRef::Host(host.id()));
        }

        if let Some(text) = event.field("mac") {
            match MacAddr::from_str(text) {
                Ok(mac) => host.mac = Some(mac),
                Err(_) => warn!("Ignoring malformed mac address {:?} for {}", text, ip),
            }
        }
        if let Some(text) = event.field("os") {
            host.os = Some(text.to_string());
        }
        match HostState::from_str(event.field("state").unwrap_or("up")) {
            Ok(state) => host.state = state,
            Err(e) => warn!("Keeping state of {}: {}", ip, e),
        }
        Ok(ObjectRef::Host(host.id()))
    }

    fn apply_port(&mut self, event: &Event) -> anyhow::Result<ObjectRef> {
        let (index, ip) = self.locate_host(event)?;

        let context_port = event
            .context
            .port
            .and_then(|id| self.find_parents(ObjectRef::Port(id)))
            .and_then(|lineage| lineage.port)
            .map(|port| (port.protocol(), port.number()));

        let (protocol, number) = match (event.field("proto"), event.field("port")) {
            (proto, Some(number)) => {
                let number: i64 = number
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("invalid port number: {number}"))?;
                let protocol = match proto {
                    Some(p) => Protocol::from_str(&p.to_ascii_lowercase())?,
                    None => context_port.map(|(p, _)| p).unwrap_or(Protocol::Tcp),
                };
                let port = Port::with_protocol(number, protocol)?;
                (port.protocol(), port.number())
            }
            (_, None) => context_port.ok_or_else(|| anyhow!("no port in event or context"))?,
        };

        let at: DateTime<Utc> = event.at;
        let host = self.host_entry(index, ip)?;
        host.last_activity = Some(at);

        if host.port(protocol, number).is_none() {
            host.add_port(Port::with_protocol(i64::from(number), protocol)?)?;
            info!("Discovered {}/{} on {}", protocol, number, ip);
        }
        let port = host
            .port_mut(protocol, number)
            .ok_or_else(|| anyhow!("port {protocol}/{number} vanished"))?;

        port.last_activity = Some(at);
        match PortState::from_str(event.field("state").unwrap_or("open")) {
            Ok(state) => port.state = state,
            Err(e) => warn!("Keeping state of {}/{} on {}: {}", protocol, number, ip, e),
        }
        Ok(ObjectRef::Port(port.id()))
    }

    // ---------------------------------------------------------------------
    // Interface refresh
    // ---------------------------------------------------------------------

    /// Re-queries the system for interface configurations.
    ///
    /// Changed interfaces are rebuilt through [`Interface::refresh`], keeping
    /// their hosts and their handle. New ones are appended and vanished ones
    /// are marked `down`. Every change is reported as a notice event.
    pub fn refresh_interfaces(&mut self) -> anyhow::Result<Vec<Event>> {
        let Some(system) = self.system.as_ref() else {
            return Ok(Vec::new());
        };
        let configs: Vec<InterfaceConfig> = system.interfaces()?;

        let mut events = Vec::new();
        let mut refreshed: Vec<Interface> = Vec::with_capacity(self.interfaces.len());

        for interface in std::mem::take(&mut self.interfaces) {
            let current = match configs.iter().find(|c| c.name == interface.name()) {
                Some(config) => config.clone(),
                None => InterfaceConfig {
                    state: LinkState::Down,
                    ..interface.config().clone()
                },
            };
            let vanished = !configs.iter().any(|c| c.name == interface.name());

            let outcome = interface.refresh(&current);
            let changed = outcome.is_changed();
            let interface = outcome.into_inner();
            if changed {
                let change = if vanished { "vanished" } else { "changed" };
                info!("Interface {} {}", interface.name(), change);
                events.push(interface_notice(&interface, change));
            }
            refreshed.push(interface);
        }

        for config in configs {
            if refreshed.iter().any(|i| i.name() == config.name) {
                continue;
            }
            let interface = Interface::new(config);
            info!("Interface {} appeared", interface.name());
            events.push(interface_notice(&interface, "added"));
            refreshed.push(interface);
        }

        self.interfaces = refreshed;
        Ok(events)
    }
}

fn interface_notice(interface: &Interface, change: &str) -> Event {
    let context = Context {
        interface: Some(interface.id()),
        host: None,
        port: None,
    };
    Event::new(JobId::default(), EventKind::Notice, context)
        .with_field("interface", interface.name())
        .with_field("change", change)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
