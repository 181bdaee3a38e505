//! Physical Ethernet ports from `class/net`.

use super::{link_name, read_parsed, read_trimmed};
use crate::error::AgentError;
use inventory_types::PortFact;
use std::path::Path;

const IFF_UP: u32 = 0x1;

/// Interfaces backed by a device, sorted by name. Virtual interfaces
/// (loopback, bridges, bonds, VLANs) have no `device` link and are skipped.
pub fn collect_ports(sysfs: &Path) -> Result<Vec<PortFact>, AgentError> {
    let class = sysfs.join("class/net");
    let entries = match std::fs::read_dir(&class) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ports = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let dir = entry.path();
        let device = dir.join("device");
        if name == "lo" || !device.exists() {
            continue;
        }
        let Some(mac) = read_trimmed(&dir.join("address")) else {
            continue;
        };

        let pci_address = link_name(&device).filter(|a| a.contains(':'));
        ports.push(PortFact {
            name,
            mac,
            pci_address,
            driver: link_name(&device.join("driver")),
            // unplugged or down links report -1 or fail the read
            speed_mbps: read_parsed::<i64>(&dir.join("speed")).and_then(|s| u32::try_from(s).ok()),
            link_up: read_trimmed(&dir.join("operstate")).as_deref() == Some("up"),
            mtu: read_parsed(&dir.join("mtu")).unwrap_or(0),
            numa_node: read_parsed::<i64>(&device.join("numa_node")).and_then(|n| u32::try_from(n).ok()),
        });
    }
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

/// Whether the interface is administratively up (`IFF_UP` in `flags`).
pub fn admin_up(sysfs: &Path, name: &str) -> bool {
    read_trimmed(&sysfs.join("class/net").join(name).join("flags"))
        .and_then(|flags| u32::from_str_radix(flags.trim_start_matches("0x"), 16).ok())
        .is_some_and(|flags| flags & IFF_UP != 0)
}
