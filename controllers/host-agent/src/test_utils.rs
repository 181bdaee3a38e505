//! Test utilities for the agent
//!
//! `FakeHost` lays out a sysfs/procfs fixture tree in a temp directory;
//! `ScriptedRunner` answers host commands from a table and records them.

#[cfg(test)]
use crate::command::CommandRunner;
#[cfg(test)]
use crate::config::{AgentConfig, LldpConfig, LockConfig, SentinelConfig};
#[cfg(test)]
use crate::error::AgentError;
#[cfg(test)]
use std::collections::{HashMap, HashSet, VecDeque};
#[cfg(test)]
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(test)]
pub struct FakeHost {
    dir: tempfile::TempDir,
}

#[cfg(test)]
impl FakeHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sys")).expect("sys");
        std::fs::create_dir_all(dir.path().join("proc")).expect("proc");
        Self { dir }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn sysfs(&self) -> PathBuf {
        self.path("sys")
    }

    pub fn procfs(&self) -> PathBuf {
        self.path("proc")
    }

    /// Config rooted in the fixture, with immediate lock retries and a
    /// single LLDP poll.
    pub fn config(&self) -> AgentConfig {
        AgentConfig {
            sysfs_root: self.sysfs(),
            procfs_root: self.procfs(),
            iscsi_initiator_file: self.path("etc/iscsi/initiatorname.iscsi"),
            sentinels: SentinelConfig {
                initial_config_complete: self.path("flags/initial_config_complete"),
                platform_ready: self.path("flags/platform_ready"),
                subfunctions_config_complete: self.path("flags/worker_config_complete"),
            },
            lock: LockConfig {
                path: self.path("run/network-config.lock"),
                attempts: 2,
                backoff_ms: 1,
            },
            lldp: LldpConfig {
                poll_window_secs: 0,
                poll_interval_ms: 1,
                lldpcli: "lldpcli".to_string(),
            },
            ..AgentConfig::default()
        }
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("parent dir");
        }
        std::fs::write(path, contents).expect("write fixture");
    }

    pub fn mkdir(&self, rel: &str) {
        std::fs::create_dir_all(self.path(rel)).expect("mkdir");
    }

    fn symlink(&self, target: &Path, rel: &str) {
        std::os::unix::fs::symlink(target, self.path(rel)).expect("symlink");
    }

    /// Raise one of the `flags/*` sentinels.
    pub fn flag(&self, name: &str) {
        self.write(&format!("flags/{name}"), "");
    }

    /// Logical cpu on socket `node`, with the given sibling list.
    pub fn cpu(&self, cpu: u32, node: u32, core: u32, siblings: &str) {
        let base = format!("sys/devices/system/cpu/cpu{cpu}");
        self.write(&format!("{base}/topology/core_id"), &format!("{core}\n"));
        self.write(&format!("{base}/topology/physical_package_id"), &format!("{node}\n"));
        self.write(&format!("{base}/topology/thread_siblings_list"), &format!("{siblings}\n"));
        self.mkdir(&format!("{base}/node{node}"));
    }

    pub fn node(&self, node: u32, total_kb: u64, free_kb: u64) {
        self.write(
            &format!("sys/devices/system/node/node{node}/meminfo"),
            &format!(
                "Node {node} MemTotal:       {total_kb} kB\nNode {node} MemFree:        {free_kb} kB\nNode {node} MemUsed:        {} kB\n",
                total_kb - free_kb
            ),
        );
    }

    /// Physical port backed by a virtio PCI function.
    pub fn port(&self, name: &str, mac: &str, pci_address: &str, up: bool) {
        let device = format!("sys/devices/pci0000:00/{pci_address}");
        self.write(&format!("{device}/numa_node"), "0\n");
        self.mkdir("sys/bus/pci/drivers/virtio_net");
        self.symlink(&self.path("sys/bus/pci/drivers/virtio_net"), &format!("{device}/driver"));

        let net = format!("sys/class/net/{name}");
        self.write(&format!("{net}/address"), &format!("{mac}\n"));
        self.write(&format!("{net}/mtu"), "1500\n");
        self.write(&format!("{net}/operstate"), if up { "up\n" } else { "down\n" });
        self.write(&format!("{net}/speed"), if up { "10000\n" } else { "-1\n" });
        self.write(&format!("{net}/flags"), if up { "0x1003\n" } else { "0x1002\n" });
        self.symlink(&self.path(&device), &format!("{net}/device"));
    }

    pub fn virtual_port(&self, name: &str, mac: &str) {
        let net = format!("sys/class/net/{name}");
        self.write(&format!("{net}/address"), &format!("{mac}\n"));
        self.write(&format!("{net}/flags"), "0x9\n");
    }

    pub fn pci(&self, address: &str, class: &str, vendor: &str, device: &str, driver: Option<&str>) {
        let base = format!("sys/bus/pci/devices/{address}");
        self.write(&format!("{base}/class"), &format!("{class}\n"));
        self.write(&format!("{base}/vendor"), &format!("{vendor}\n"));
        self.write(&format!("{base}/device"), &format!("{device}\n"));
        if let Some(driver) = driver {
            let target = format!("sys/bus/pci/drivers/{driver}");
            self.mkdir(&target);
            self.symlink(&self.path(&target), &format!("{base}/driver"));
        }
    }
}

/// Answers commands by their full command line. Unscripted commands succeed
/// with empty output.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<HashMap<String, String>>>,
    once: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[cfg(test)]
impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command: &str, output: &str) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.to_string(), output.to_string());
    }

    /// Answer the next call of `command` with `output`; later calls fall
    /// back to [`respond`](Self::respond).
    pub fn respond_once(&self, command: &str, output: &str) {
        self.once
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(command.to_string())
            .or_default()
            .push_back(output.to_string());
    }

    pub fn fail(&self, command: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, AgentError> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());
        if self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&line)
        {
            return Err(AgentError::Command {
                program: program.to_string(),
                message: "exit status: 1".to_string(),
            });
        }
        let queued = self
            .once
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&line)
            .and_then(VecDeque::pop_front);
        if let Some(output) = queued {
            return Ok(output);
        }
        Ok(self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&line)
            .cloned()
            .unwrap_or_default())
    }
}
