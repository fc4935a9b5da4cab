// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::io;

use lookout_common::error::{ManifestError, TopologyError};
use lookout_common::models::object::{ContextKind, JobId};
use lookout_common::models::port::Protocol;
use thiserror::Error;

use crate::path::PathError;

/// Failures of jobs and of the job registry.
#[derive(Debug, Error)]
pub enum JobError {
    /// The manifest does not accept the requested context depth.
    #[error("{manifest} does not accept {kind} contexts")]
    Context {
        manifest: String,
        kind: ContextKind,
    },

    #[error("no such signal: {0}")]
    Signal(String),

    /// Spawning failed. The job stays in `init`.
    #[error("failed to launch {manifest}: {source}")]
    Launch {
        manifest: String,
        #[source]
        source: io::Error,
    },

    #[error("the job has not been started")]
    NotStarted,

    #[error("the job has already been started")]
    AlreadyStarted,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("the job is still running")]
    Running,

    #[error("no job found with id {0}")]
    NotFound(JobId),

    #[error(transparent)]
    Foreign(#[from] TopologyError),

    /// Failures of individual members of a multiplexed job, by member index.
    #[error("{}", summarize(.0))]
    Members(Vec<(usize, JobError)>),

    /// A multiplexed job was registered although some members failed to launch.
    #[error("job {job} started with failures: {source}")]
    PartialLaunch {
        job: JobId,
        #[source]
        source: Box<JobError>,
    },

    #[error("a job needs at least one context")]
    NoContexts,

    /// Context `index` of a multiplexed job repeats an earlier one.
    #[error("context {index} is given more than once")]
    DuplicateContext { index: usize },
}

fn summarize(failures: &[(usize, JobError)]) -> String {
    failures
        .iter()
        .map(|(index, err)| format!("member {index}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a [`Controller`] call can fail with.
///
/// The display text is meant to be shown to the user as is.
///
/// [`Controller`]: crate::controller::Controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("can not create {0}")]
    NotCreatable(&'static str),

    #[error("invalid port: {proto}/{name}")]
    InvalidPort { proto: Protocol, name: String },

    #[error("invalid ip address: {0}")]
    InvalidAddress(String),

    #[error("host exists: {0}")]
    HostExists(String),

    #[error("port exists: {0}")]
    PortExists(String),

    #[error("can not drop {0}")]
    NotDroppable(&'static str),

    /// A job still runs against the device or something below it.
    #[error("device is in use by job {job}: {device}")]
    InUse { job: JobId, device: String },

    #[error("job manifest not found: {0}")]
    ManifestNotFound(String),

    #[error(transparent)]
    Manifest(ManifestError),

    #[error("inappropriate context for job: {manifest} does not accept {kind} contexts")]
    InappropriateContext {
        manifest: String,
        kind: ContextKind,
    },

    #[error("duplicate context for job: {0}")]
    DuplicateContext(String),

    #[error("no such signal: {0}")]
    NoSuchSignal(String),

    #[error("no job found with id {0}")]
    NoJob(JobId),

    #[error("the job is still running")]
    JobRunning,

    /// The job was registered, but some of its members did not launch.
    #[error("job {job} started with failures: {source}")]
    PartialLaunch {
        job: JobId,
        #[source]
        source: Box<JobError>,
    },

    #[error(transparent)]
    Job(JobError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    System(#[from] anyhow::Error),
}

impl From<ManifestError> for ControllerError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound(name) => ControllerError::ManifestNotFound(name),
            other => ControllerError::Manifest(other),
        }
    }
}

impl From<JobError> for ControllerError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Context { manifest, kind } => {
                ControllerError::InappropriateContext { manifest, kind }
            }
            JobError::Signal(name) => ControllerError::NoSuchSignal(name),
            JobError::NotFound(id) => ControllerError::NoJob(id),
            JobError::Running => ControllerError::JobRunning,
            JobError::PartialLaunch { job, source } => ControllerError::PartialLaunch { job, source },
            JobError::Foreign(err) => ControllerError::Topology(err),
            other => ControllerError::Job(other),
        }
    }
}
