//! Per-node memory from `devices/system/node/node*/meminfo`, falling back
//! to `/proc/meminfo` on hosts without NUMA.

use super::{numbered_entries, read_parsed};
use crate::error::AgentError;
use inventory_types::MemoryFact;
use std::collections::HashMap;
use std::path::Path;

/// Per-node memory from sysfs, with totals from `/proc/meminfo`.
pub fn collect_memory(sysfs: &Path, procfs: &Path) -> Result<Vec<MemoryFact>, AgentError> {
    let nodes = numbered_entries(&sysfs.join("devices/system/node"), "node")?;
    if nodes.is_empty() {
        let text = std::fs::read_to_string(procfs.join("meminfo"))?;
        let values = parse_meminfo(&text);
        let total = values.get("MemTotal").copied().unwrap_or(0);
        let available = values
            .get("MemAvailable")
            .or_else(|| values.get("MemFree"))
            .copied()
            .unwrap_or(0);
        return Ok(vec![MemoryFact {
            numa_node: 0,
            total_mib: total / 1024,
            available_mib: available / 1024,
            hugepages_2m_total: values.get("HugePages_Total").copied().unwrap_or(0),
            hugepages_1g_total: 0,
            platform_reserved_mib: 0,
        }]);
    }

    let mut memory = Vec::new();
    for (numa_node, dir) in nodes {
        let text = std::fs::read_to_string(dir.join("meminfo"))?;
        let values = parse_meminfo(&text);
        let hugepages = dir.join("hugepages");
        memory.push(MemoryFact {
            numa_node,
            total_mib: values.get("MemTotal").copied().unwrap_or(0) / 1024,
            available_mib: values.get("MemFree").copied().unwrap_or(0) / 1024,
            hugepages_2m_total: read_parsed(&hugepages.join("hugepages-2048kB/nr_hugepages")).unwrap_or(0),
            hugepages_1g_total: read_parsed(&hugepages.join("hugepages-1048576kB/nr_hugepages")).unwrap_or(0),
            platform_reserved_mib: 0,
        });
    }
    Ok(memory)
}

/// Key to value (kB or a count). Handles both `MemTotal: 16 kB` and the
/// per-node `Node 0 MemTotal: 16 kB` forms.
fn parse_meminfo(text: &str) -> HashMap<String, u64> {
    text.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let key = key.split_whitespace().last()?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.to_string(), value))
        })
        .collect()
}
