// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Turns controller records into terminal lines.
//!
//! With `--json` every record is printed as one JSON document per line,
//! otherwise as a colored tree.

use colored::*;
use serde::Serialize;

use lookout_common::config::Config;
use lookout_core::controller::Controller;
use lookout_core::job::JobState;
use lookout_core::stat::{JobInfo, Report, Stat};

use crate::lprint;
use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    lprint!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn or_dash(value: Option<&str>, color: Color) -> ColoredString {
    match value {
        Some(text) => text.color(color),
        None => "-".color(colors::SEPARATOR),
    }
}

fn state_color(state: &str) -> Color {
    match state {
        "up" | "open" | "running" | "exited" => colors::STATE_GOOD,
        "down" | "closed" | "terminated" => colors::STATE_BAD,
        _ => colors::STATE_UNKNOWN,
    }
}

fn detail(key: &str, value: ColoredString) -> Detail {
    (key.to_string(), value)
}

/// Short name of a record, as `ls` would print it.
pub fn title(stat: &Stat) -> String {
    match stat {
        Stat::LocalHost { username, hostname } => format!("{username}@{hostname}"),
        Stat::Interface { name, .. } => name.clone(),
        Stat::Host { ip, .. } => ip.clone(),
        Stat::Port { number, proto, .. } => format!("{proto}/{number}"),
        Stat::Protocol { name } => name.to_string(),
    }
}

pub fn details(stat: &Stat) -> Vec<Detail> {
    match stat {
        Stat::LocalHost { username, hostname } => vec![
            detail("User", username.as_str().color(colors::TEXT_DEFAULT)),
            detail("Hostname", hostname.as_str().color(colors::TEXT_DEFAULT)),
        ],
        Stat::Interface {
            ip,
            mask,
            mac,
            gateway,
            state,
            ..
        } => vec![
            detail("IPv4", or_dash(ip.as_deref(), colors::IPV4_ADDR)),
            detail("Mask", or_dash(mask.as_deref(), colors::IPV4_ADDR)),
            detail("Gateway", or_dash(gateway.as_deref(), colors::IPV4_ADDR)),
            detail("MAC", or_dash(mac.as_deref(), colors::MAC_ADDR)),
            detail("State", state.as_str().color(state_color(state.as_str()))),
        ],
        Stat::Host {
            mac,
            os,
            last_activity,
            state,
            ..
        } => vec![
            detail("MAC", or_dash(mac.as_deref(), colors::MAC_ADDR)),
            detail("OS", or_dash(os.as_deref(), colors::OS_NAME)),
            detail("Seen", seen(last_activity)),
            detail("State", state.as_str().color(state_color(state.as_str()))),
        ],
        Stat::Port {
            last_activity,
            state,
            ..
        } => vec![
            detail("Seen", seen(last_activity)),
            detail("State", state.as_str().color(state_color(state.as_str()))),
        ],
        Stat::Protocol { .. } => Vec::new(),
    }
}

fn seen(at: &Option<chrono::DateTime<chrono::Utc>>) -> ColoredString {
    let text = at.map(|t| t.format("%H:%M:%S").to_string());
    or_dash(text.as_deref(), colors::SECONDARY)
}

pub fn print_stat(stat: &Stat, idx: usize, cfg: &Config) -> anyhow::Result<()> {
    if cfg.json {
        return json(stat);
    }
    if cfg.quiet > 1 {
        lprint!("{}", title(stat));
        return Ok(());
    }
    print::tree_head(idx, &title(stat));
    print::as_tree(&details(stat), 0);
    Ok(())
}

pub fn print_report(report: &Report, cfg: &Config) -> anyhow::Result<()> {
    if cfg.json {
        return json(report);
    }

    let fields: String = report
        .fields
        .iter()
        .map(|(k, v)| format!("{}={}", k.italic(), v))
        .collect::<Vec<_>>()
        .join(" ");
    let device: ColoredString = or_dash(report.device.as_deref(), colors::PRIMARY);

    lprint!(
        "{} {} {:<6} {} {}",
        format!("[{}]", report.job.to_string().color(colors::ACCENT)).color(colors::SEPARATOR),
        report.at.format("%H:%M:%S").to_string().color(colors::SEPARATOR),
        report.kind.as_str().color(colors::SECONDARY),
        device,
        fields.color(colors::TEXT_DEFAULT)
    );
    Ok(())
}

pub fn print_job(info: &JobInfo, cfg: &Config) -> anyhow::Result<()> {
    if cfg.json {
        return json(info);
    }

    let pid = info.pid.map(|p| p.to_string());
    let code = info.return_code.map(|c| c.to_string());
    let state = info.state.as_str();

    print::tree_head(info.id.0 as usize, &info.name);
    print::as_tree(
        &[
            detail("Context", info.context.as_str().color(colors::PRIMARY)),
            detail("State", state.color(state_color(state))),
            detail("PID", or_dash(pid.as_deref(), colors::TEXT_DEFAULT)),
            detail("Exit code", or_dash(code.as_deref(), colors::TEXT_DEFAULT)),
            detail("Members", info.members.to_string().color(colors::TEXT_DEFAULT)),
        ],
        0,
    );
    Ok(())
}

/// One line per job, used by `jobs`.
pub fn job_line(info: &JobInfo) -> String {
    let state = match info.state {
        JobState::Running => info.state.as_str().to_string(),
        _ => match info.return_code {
            Some(code) => format!("{} ({code})", info.state),
            None => info.state.as_str().to_string(),
        },
    };
    format!("{:>3}  {:<12} {:<16} {}", info.id, info.name, state, info.context)
}

/// Prints every interface that has hosts, with their hosts and ports.
pub fn print_topology(controller: &Controller, cfg: &Config) -> anyhow::Result<()> {
    let mut shown = 0;
    for interface in controller.list("/")? {
        let iface_path = format!("/{interface}");
        let hosts = controller.listat(&iface_path)?;
        if hosts.is_empty() {
            continue;
        }

        if cfg.json {
            for host in &hosts {
                json(host)?;
            }
            continue;
        }

        if shown > 0 {
            lprint!();
        }
        print::tree_head(shown, &interface);
        for host in &hosts {
            let host_path = format!("{iface_path}/{}", title(host));
            lprint!("   {}", title(host).color(colors::IPV4_ADDR).bold());
            let mut rows = details(host);
            for port in controller.listat(&host_path)? {
                if let Stat::Port { state, .. } = &port {
                    rows.push(detail(&title(&port), state.as_str().color(state_color(state.as_str()))));
                }
            }
            print::as_tree(&rows, 1);
        }
        shown += 1;
    }

    if shown == 0 && !cfg.json {
        print::centerln(&"nothing discovered".color(colors::SEPARATOR).to_string());
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
