//! PCI devices from `bus/pci/devices`.

use super::{link_name, read_parsed, read_trimmed};
use crate::error::AgentError;
use inventory_types::PciDeviceFact;
use std::path::Path;

/// Every PCI device under `bus/pci/devices`.
pub fn collect_pci_devices(sysfs: &Path) -> Result<Vec<PciDeviceFact>, AgentError> {
    let bus = sysfs.join("bus/pci/devices");
    let entries = match std::fs::read_dir(&bus) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry?;
        let dir = entry.path();
        let pci_address = entry.file_name().to_string_lossy().into_owned();
        let (Some(class_id), Some(vendor_id), Some(device_id)) = (
            hex_id(&dir.join("class")),
            hex_id(&dir.join("vendor")),
            hex_id(&dir.join("device")),
        ) else {
            continue;
        };

        devices.push(PciDeviceFact {
            pci_address,
            class_id,
            vendor_id,
            device_id,
            driver: link_name(&dir.join("driver")),
            numa_node: read_parsed::<i64>(&dir.join("numa_node")).and_then(|n| u32::try_from(n).ok()),
            sriov_totalvfs: read_parsed(&dir.join("sriov_totalvfs")).unwrap_or(0),
            enabled: read_trimmed(&dir.join("enable")).is_none_or(|v| v != "0"),
        });
    }
    devices.sort_by(|a, b| a.pci_address.cmp(&b.pci_address));
    Ok(devices)
}

/// `0x020000` → `020000`
fn hex_id(path: &Path) -> Option<String> {
    read_trimmed(path).map(|v| v.trim_start_matches("0x").to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_devices_read_and_sorted() {
        let host = FakeHost::new();
        host.pci("0000:3b:00.0", "0x020000", "0x8086", "0x1572", Some("i40e"));
        host.write("sys/bus/pci/devices/0000:3b:00.0/sriov_totalvfs", "64\n");
        host.write("sys/bus/pci/devices/0000:3b:00.0/numa_node", "1\n");
        host.pci("0000:00:1f.6", "0x020000", "0x8086", "0x15BB", None);
        host.write("sys/bus/pci/devices/0000:00:1f.6/enable", "0\n");

        let devices = collect_pci_devices(&host.sysfs()).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].pci_address, "0000:00:1f.6");
        assert_eq!(devices[0].device_id, "15bb");
        assert!(!devices[0].enabled);
        assert_eq!(devices[0].driver, None);
        assert_eq!(devices[1].class_id, "020000");
        assert_eq!(devices[1].driver.as_deref(), Some("i40e"));
        assert_eq!(devices[1].sriov_totalvfs, 64);
        assert_eq!(devices[1].numa_node, Some(1));
        assert!(devices[1].enabled);
    }
}
