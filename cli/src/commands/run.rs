// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # `lookout run`
//!
//! Starts one manifest, polls the engine every `--interval` until the job
//! ends and prints each report as it comes in. `q` or Ctrl-C sends `term`
//! to the job; the loop keeps polling until the process is actually gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use colored::*;
use lookout_common::config::Config;
use lookout_common::models::object::JobId;
use lookout_common::{success, warn};
use lookout_core::controller::Controller;
use lookout_core::error::ControllerError;
use tracing::info_span;

use crate::commands::open_controller;
use crate::lprint;
use crate::terminal::input::InputHandle;
use crate::terminal::spinner::SpinnerGuard;
use crate::terminal::{colors, format, print};

pub async fn run(
    manifest: &str,
    contexts: &[String],
    show_output: bool,
    cfg: &Config,
) -> anyhow::Result<()> {
    let mut controller = open_controller(cfg)?;
    print::header(&format!("running {manifest}"), cfg);

    let jid = start(&mut controller, manifest, contexts)?;
    let start_time = Instant::now();
    let event_count = Arc::new(AtomicUsize::new(0));

    {
        let _guard = run_spinner(jid, event_count.clone());
        poll_until_done(&mut controller, jid, &event_count, cfg).await?;
    }

    let info = controller.info(jid)?;
    if show_output {
        print::header("job output", cfg);
        for line in controller.read(jid)?.lines() {
            lprint!("{}", line);
        }
    }

    print::header("discovered", cfg);
    format::print_topology(&controller, cfg)?;

    if !cfg.json {
        print::divider();
        let summary = format!(
            "Job {} {} with code {} after {:.2}s, {} events",
            jid,
            info.state,
            info.return_code.unwrap_or_default(),
            start_time.elapsed().as_secs_f64(),
            event_count.load(Ordering::Relaxed)
        );
        match cfg.quiet {
            0 => print::centerln(&summary.color(colors::TEXT_DEFAULT).to_string()),
            _ => success!("{}", summary),
        }
    }
    Ok(())
}

fn start(controller: &mut Controller, manifest: &str, contexts: &[String]) -> anyhow::Result<JobId> {
    let started = match contexts {
        [] => controller.run(manifest, "/"),
        [context] => controller.run(manifest, context),
        many => controller.run_mux(manifest, many),
    };

    match started {
        Ok(jid) => Ok(jid),
        Err(ControllerError::PartialLaunch { job, source }) => {
            warn!("Continuing with job {}: {}", job, source);
            Ok(job)
        }
        Err(e) => Err(e.into()),
    }
}

async fn poll_until_done(
    controller: &mut Controller,
    jid: JobId,
    event_count: &AtomicUsize,
    cfg: &Config,
) -> anyhow::Result<()> {
    let mut input = InputHandle::new();
    if !cfg.disable_input {
        input.start();
    }

    let mut interval = tokio::time::interval(cfg.poll_interval);
    let mut interrupted = false;

    loop {
        let mut stop = false;
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => stop = true,
        }
        stop |= input.should_interrupt();

        if stop && !interrupted {
            warn!("Interrupted, sending term to job {}", jid);
            controller.signal(jid, "term")?;
            interrupted = true;
        }

        for report in controller.update() {
            event_count.fetch_add(1, Ordering::Relaxed);
            format::print_report(&report, cfg)?;
        }

        if controller.info(jid)?.state.is_terminal() {
            return Ok(());
        }
    }
}

fn run_spinner(jid: JobId, event_count: Arc<AtomicUsize>) -> SpinnerGuard {
    let span = info_span!("run", indicatif.pb_show = true);
    let _enter = span.enter();

    SpinnerGuard::with_status(span.clone(), move || {
        let count = event_count.load(Ordering::Relaxed);
        let label = if count == 1 { "event" } else { "events" };
        format!(
            "Job {} running, {} {} so far...",
            jid,
            count.to_string().green().bold(),
            label
        )
        .color(colors::TEXT_DEFAULT)
        .italic()
    })
}
