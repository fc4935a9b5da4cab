// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::{cell::Cell, fmt::Display};

use colored::*;
use lookout_common::config::Config;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;

thread_local! {
    pub static GLOBAL_KEY_WIDTH: Cell<usize> = const { Cell::new(0) }
}

/// Program output, printed above the spinner and never filtered.
#[macro_export]
macro_rules! lprint {
    () => {
        $crate::lprint!("");
    };
    ($($arg:tt)*) => {
        tracing::info!(
            target: "lookout::print",
            raw_msg = %format_args!($($arg)*)
        );
    };
}

pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

pub fn banner(cfg: &Config) {
    if cfg.no_banner || cfg.quiet > 0 || cfg.json {
        return;
    }

    let text_content: String = format!("⟦ LOOKOUT v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = console::measure_text_width(&text_content);
    let sep: ColoredString = "═"
        .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
        .bright_black();

    lprint!("{}{}{}", sep, text_content.bright_green().bold(), sep);
}

pub fn header(msg: &str, cfg: &Config) {
    if cfg.json {
        return;
    }
    if cfg.quiet > 0 {
        lprint!();
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let dash_count: usize = TOTAL_WIDTH.saturating_sub(formatted.chars().count());
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    lprint!("{}", line);
}

pub fn end_of_program(cfg: &Config) {
    if cfg.quiet > 0 || cfg.json {
        return;
    }
    divider();
}

pub fn divider() {
    lprint!("{}", "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR));
}

pub fn aligned_line<V>(key: &str, value: V)
where
    V: Display + WithDefaultColor,
{
    let dots: String = ".".repeat((GLOBAL_KEY_WIDTH.get() + 1).saturating_sub(key.len()));
    let colon: String = format!(
        "{}{}",
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    let value: ColoredString = value.with_default(colors::TEXT_DEFAULT);
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    lprint!(
        "{} {}",
        ">".color(colors::SEPARATOR),
        msg.as_ref().color(colors::TEXT_DEFAULT)
    );
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    lprint!(
        "{} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    );
}

/// Prints `key....: value` rows joined by tree branches, indented by `depth`.
pub fn as_tree(details: &[(String, ColoredString)], depth: usize) {
    let padding_width: usize = details.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let indent: String = "   ".repeat(depth);

    for (i, (key, value)) in details.iter().enumerate() {
        let last: bool = i + 1 == details.len();
        let branch: ColoredString = if !last { "├─" } else { "└─" }.bright_black();
        let dots: ColoredString = ".".repeat(padding_width - key.len()).color(colors::SEPARATOR);

        lprint!(
            "{} {} {}{}{} {}",
            indent,
            branch,
            key.color(colors::TEXT_DEFAULT),
            dots,
            ":".color(colors::SEPARATOR),
            value
        );
    }
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    lprint!("{}{}{}", space, msg, space);
}
