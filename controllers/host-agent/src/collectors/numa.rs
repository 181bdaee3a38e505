//! NUMA nodes from `devices/system/node`.

use super::numbered_entries;
use crate::error::AgentError;
use inventory_types::NumaNodeFact;
use std::path::Path;

/// Hosts without NUMA support report a single node 0.
pub fn collect_numa_nodes(sysfs: &Path) -> Result<Vec<NumaNodeFact>, AgentError> {
    let nodes: Vec<NumaNodeFact> = numbered_entries(&sysfs.join("devices/system/node"), "node")?
        .into_iter()
        .map(|(numa_node, _)| NumaNodeFact { numa_node })
        .collect();
    if nodes.is_empty() {
        return Ok(vec![NumaNodeFact { numa_node: 0 }]);
    }
    Ok(nodes)
}
