// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

#![cfg(all(test, unix))]
use std::thread;
use std::time::{Duration, Instant};

use lookout_common::models::event::EventKind;
use lookout_common::models::host::HostState;
use lookout_core::error::ControllerError;
use lookout_core::job::JobState;
use lookout_core::stat::Stat;

use crate::utils::{ManifestFixture, wait_for};

const SWEEP: &str = r#"
description = "canned sweep"
command = "/bin/sh"
args = ["-c", "echo up 10.0.0.7; echo open 10.0.0.7 22; echo unrelated chatter"]

[[rules]]
pattern = '^up (?P<ip>\S+)$'
event = "host"

[[rules]]
pattern = '^open (?P<ip>\S+) (?P<port>\d+)$'
event = "port"
fields = { proto = "tcp" }
"#;

const FINGERPRINT: &str = r#"
command = "/bin/sh"
args = ["-c", "echo guess {host} linux"]
contexts = ["host"]

[[rules]]
pattern = '^guess (?P<ip>\S+) (?P<os>\w+)$'
event = "os"
"#;

const FAILING: &str = r#"
command = "/bin/sh"
args = ["-c", "echo partial; exit 3"]
"#;

const SLEEPER: &str = r#"
command = "sleep"
args = ["30"]
"#;

const ECHO: &str = r#"
command = "cat"
"#;

#[test]
fn test_sweep_populates_the_topology() {
    let fixture = ManifestFixture::new().with("sweep", SWEEP);
    let mut ctl = fixture.controller();

    let jid = ctl.run("sweep", "/").expect("run sweep");
    let reports = wait_for(&mut ctl, jid);

    assert_eq!(ctl.list("/eth0").unwrap(), vec!["10.0.0.7"]);
    assert_eq!(ctl.list("/eth0/10.0.0.7/tcp").unwrap(), vec!["22"]);

    let devices: Vec<Option<&str>> = reports
        .iter()
        .filter(|r| r.kind != EventKind::Exit)
        .map(|r| r.device.as_deref())
        .collect();
    assert_eq!(
        devices,
        vec![Some("/eth0/10.0.0.7"), Some("/eth0/10.0.0.7/tcp/22")]
    );

    let info = ctl.info(jid).unwrap();
    assert_eq!(info.state, JobState::Exited);
    assert_eq!(info.return_code, Some(0));
    assert!(ctl.read(jid).unwrap().contains("unrelated chatter"));

    match ctl.stat("/eth0/10.0.0.7").unwrap() {
        Stat::Host { state, .. } => assert_eq!(state, HostState::Up),
        other => panic!("expected a host, got {other:?}"),
    }
}

#[test]
fn test_host_context_binds_the_address() {
    let fixture = ManifestFixture::new().with("fingerprint", FINGERPRINT);
    let mut ctl = fixture.controller();
    ctl.create("/eth0", "10.0.0.9").unwrap();

    let jid = ctl.run("fingerprint", "/eth0/10.0.0.9").expect("run fingerprint");
    wait_for(&mut ctl, jid);

    match ctl.stat("/eth0/10.0.0.9").unwrap() {
        Stat::Host { os, .. } => assert_eq!(os.as_deref(), Some("linux")),
        other => panic!("expected a host, got {other:?}"),
    }
    assert_eq!(ctl.jobs("/eth0/10.0.0.9").unwrap(), vec![jid]);
    assert!(ctl.jobs("/").unwrap().is_empty());
}

#[test]
fn test_failing_tool_reports_its_exit_code() {
    let fixture = ManifestFixture::new().with("failing", FAILING);
    let mut ctl = fixture.controller();

    let jid = ctl.run("failing", "/").unwrap();
    let reports = wait_for(&mut ctl, jid);

    let exit = reports
        .iter()
        .find(|r| r.kind == EventKind::Exit)
        .expect("exit report");
    assert_eq!(exit.fields.get("return_code").map(String::as_str), Some("3"));
    assert_eq!(ctl.info(jid).unwrap().return_code, Some(3));
    assert_eq!(ctl.read(jid).unwrap(), "partial\n");
}

#[test]
fn test_term_stops_a_running_job() {
    let fixture = ManifestFixture::new().with("sleeper", SLEEPER);
    let mut ctl = fixture.controller();

    let jid = ctl.run("sleeper", "/").unwrap();
    assert!(matches!(
        ctl.drop_job(jid),
        Err(ControllerError::JobRunning)
    ));

    ctl.signal(jid, "term").unwrap();
    wait_for(&mut ctl, jid);

    let info = ctl.info(jid).unwrap();
    assert_eq!(info.state, JobState::Terminated);
    assert_eq!(info.return_code, Some(-15));

    ctl.drop_job(jid).unwrap();
    assert!(matches!(ctl.info(jid), Err(ControllerError::NoJob(_))));
}

#[test]
fn test_written_lines_come_back() {
    let fixture = ManifestFixture::new().with("echo", ECHO);
    let mut ctl = fixture.controller();

    let jid = ctl.run("echo", "/").unwrap();
    ctl.write(jid, b"hello lookout\n").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = String::new();
    while !seen.contains("hello lookout") {
        assert!(Instant::now() < deadline, "echo never came back");
        ctl.update();
        seen.push_str(&ctl.read(jid).unwrap());
        thread::sleep(Duration::from_millis(20));
    }

    ctl.signal(jid, "kill").unwrap();
    wait_for(&mut ctl, jid);
    assert_eq!(ctl.info(jid).unwrap().return_code, Some(-9));
}

#[test]
fn test_mux_runs_one_member_per_host() {
    let fixture = ManifestFixture::new().with("fingerprint", FINGERPRINT);
    let mut ctl = fixture.controller();
    ctl.create("/eth0", "10.0.0.5").unwrap();
    ctl.create("/eth0", "10.0.0.6").unwrap();

    let jid = ctl
        .run_mux("fingerprint", &["/eth0/10.0.0.5", "/eth0/10.0.0.6"])
        .expect("run mux");
    wait_for(&mut ctl, jid);

    let info = ctl.info(jid).unwrap();
    assert_eq!(info.members, 2);
    assert_eq!(info.return_code, Some(0));
    for host in ["/eth0/10.0.0.5", "/eth0/10.0.0.6"] {
        match ctl.stat(host).unwrap() {
            Stat::Host { os, .. } => assert_eq!(os.as_deref(), Some("linux")),
            other => panic!("expected a host, got {other:?}"),
        }
    }
}

#[test]
fn test_missing_and_misplaced_manifests() {
    let fixture = ManifestFixture::new().with("fingerprint", FINGERPRINT);
    let mut ctl = fixture.controller();

    assert!(matches!(
        ctl.run("nmap", "/"),
        Err(ControllerError::ManifestNotFound(_))
    ));
    assert!(matches!(
        ctl.run("fingerprint", "/eth0"),
        Err(ControllerError::InappropriateContext { .. })
    ));
    assert!(ctl.jobs("/").unwrap().is_empty());
}
