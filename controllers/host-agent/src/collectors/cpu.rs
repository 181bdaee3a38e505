//! Logical CPU topology from `devices/system/cpu`.

use super::{numbered_entries, parse_cpu_list, read_parsed, read_trimmed};
use crate::error::AgentError;
use inventory_types::CpuFact;
use std::path::Path;

/// Every online logical cpu, sorted by id. The thread index is the cpu's
/// position in its core's sibling list.
pub fn collect_cpus(sysfs: &Path, procfs: &Path) -> Result<Vec<CpuFact>, AgentError> {
    let model = cpu_model(procfs);
    let mut cpus = Vec::new();

    for (cpu, dir) in numbered_entries(&sysfs.join("devices/system/cpu"), "cpu")? {
        let topology = dir.join("topology");
        // offline cpus have no topology
        let Some(core) = read_parsed::<u32>(&topology.join("core_id")) else {
            continue;
        };
        let socket = read_parsed::<u32>(&topology.join("physical_package_id")).unwrap_or(0);
        let siblings = match read_trimmed(&topology.join("thread_siblings_list")) {
            Some(list) => parse_cpu_list(&list)?,
            None => vec![cpu],
        };
        let thread = siblings.iter().position(|s| *s == cpu).unwrap_or(0);
        let numa_node = numbered_entries(&dir, "node")?
            .first()
            .map_or(0, |(n, _)| *n);

        cpus.push(CpuFact {
            cpu,
            numa_node,
            socket,
            core,
            thread: u32::try_from(thread).unwrap_or(0),
            model: model.clone(),
        });
    }
    Ok(cpus)
}

fn cpu_model(procfs: &Path) -> Option<String> {
    let text = std::fs::read_to_string(procfs.join("cpuinfo")).ok()?;
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "model name")
        .map(|(_, value)| value.trim().to_string())
}
