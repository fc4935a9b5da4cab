// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

mod engine;

#[cfg(unix)]
pub mod utils {
    use std::fs;
    use std::net::Ipv4Addr;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use lookout_common::manifest::ManifestDir;
    use lookout_common::models::interface::{InterfaceConfig, LinkState};
    use lookout_common::models::object::JobId;
    use lookout_common::system::Identity;
    use lookout_core::controller::Controller;
    use lookout_core::localhost::LocalHost;
    use lookout_core::process::SystemSpawner;
    use lookout_core::stat::Report;

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    /// RAII wrapper for a scratch manifest directory.
    pub struct ManifestFixture {
        pub dir: PathBuf,
    }

    impl ManifestFixture {
        pub fn new() -> Self {
            let dir = std::env::temp_dir().join(format!(
                "lookout-manifests-{}-{}",
                std::process::id(),
                NEXT_DIR.fetch_add(1, Ordering::Relaxed)
            ));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).expect("create manifest dir");
            Self { dir }
        }

        pub fn with(self, name: &str, text: &str) -> Self {
            fs::write(self.dir.join(format!("{name}.toml")), text).expect("write manifest");
            self
        }

        /// A controller over one fixed `eth0` at 10.0.0.2/24 and real processes.
        pub fn controller(&self) -> Controller {
            let identity = Identity {
                username: "tester".into(),
                hostname: "lab".into(),
            };
            let eth0 = InterfaceConfig {
                name: "eth0".into(),
                ip: Some(Ipv4Addr::new(10, 0, 0, 2)),
                mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
                gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
                mac: None,
                state: LinkState::Up,
            };
            let localhost =
                LocalHost::with_interfaces(identity, vec![eth0], Box::new(SystemSpawner));
            Controller::new(localhost, Box::new(ManifestDir::new(&self.dir)))
        }
    }

    impl Drop for ManifestFixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    /// Polls the controller until `jid` reaches a terminal state.
    pub fn wait_for(controller: &mut Controller, jid: JobId) -> Vec<Report> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reports = Vec::new();

        loop {
            reports.extend(controller.update());
            let info = controller.info(jid).expect("job info");
            if info.state.is_terminal() {
                return reports;
            }
            assert!(Instant::now() < deadline, "job {jid} did not finish in time");
            thread::sleep(Duration::from_millis(20));
        }
    }
}
