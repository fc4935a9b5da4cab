// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Terminal UI & Logging
//!
//! 1.  **Global Logging**: Wires up `tracing` so that `info!`, `warn!`, etc.
//!     print to stderr above the progress bar instead of through it.
//! 2.  **The Spinner**: A background animation showing what a running job has
//!     produced so far ("Job 1: 14 events...").
//!
//! The spinner runs in its own `tokio` task and only redraws when the status
//! text changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::*;
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::{IndicatifLayer, span_ext::IndicatifSpanExt};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::terminal::logging;

const TICK: Duration = Duration::from_millis(100);

/// Wires up the global tracing subscriber.
///
/// 1.  **Filter**: `RUST_LOG`, or `info,lookout=debug` when unset.
/// 2.  **Formatter**: [`logging::LookoutFormatter`], hiding records above `-v`.
/// 3.  **Indicatif**: Keeps log lines above the spinner.
pub fn init_logging(verbosity: u8) {
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    let indicatif_layer = IndicatifLayer::new().with_progress_style(style);

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lookout=debug,mio=error"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .event_format(logging::LookoutFormatter {
            max_verbosity: verbosity,
        })
        .with_writer(indicatif_layer.get_stderr_writer());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(formatting_layer)
        .with(indicatif_layer)
        .init();
}

async fn run_spinner_loop<F>(span: Span, running: Arc<AtomicBool>, status_fn: F)
where
    F: Fn() -> ColoredString + Send + Sync + 'static,
{
    let mut interval = tokio::time::interval(TICK);
    let mut last_text = String::new();

    while running.load(Ordering::Relaxed) {
        interval.tick().await;

        let current_text = status_fn().to_string();
        if current_text != last_text {
            span.pb_set_message(&current_text);
            last_text = current_text;
        }
    }
}

/// Keeps the spinner spinning until dropped.
pub struct SpinnerGuard {
    running: Arc<AtomicBool>,
    handle: tokio::task::JoinHandle<()>,
}

impl SpinnerGuard {
    pub fn with_status<F>(span: Span, status_fn: F) -> Self
    where
        F: Fn() -> ColoredString + Send + Sync + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let run_clone = running.clone();

        let handle = tokio::spawn(async move {
            run_spinner_loop(span, run_clone, status_fn).await;
        });

        Self { running, handle }
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.handle.abort();
    }
}
