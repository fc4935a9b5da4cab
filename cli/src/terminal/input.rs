// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Watches the keyboard for `q` or Ctrl-C while a job runs.
//!
//! The terminal is in raw mode while the listener is active, so Ctrl-C
//! arrives here as a key press instead of as a signal.

use std::sync::mpsc;
use std::thread;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use lookout_common::debug;

pub struct InputHandle {
    rx: mpsc::Receiver<()>,
    tx: Option<mpsc::Sender<()>>,
}

impl InputHandle {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { rx, tx: Some(tx) }
    }

    pub fn start(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        thread::spawn(move || {
            if let Err(e) = enable_raw_mode() {
                debug!("Keyboard listener disabled: {}", e);
                return;
            }
            loop {
                let Ok(Event::Key(key)) = event::read() else {
                    continue;
                };
                let is_q = key.code == KeyCode::Char('q');
                let is_ctrl_c =
                    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);

                if (is_q || is_ctrl_c) && key.kind == KeyEventKind::Press {
                    let _ = tx.send(());
                    break;
                }
            }
            let _ = disable_raw_mode();
        });
    }

    pub fn should_interrupt(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}
