//! CPU topology reconciliation and default role allocation.

use super::Reconciler;
use crate::config::CpuAllocationConfig;
use crate::error::ControllerError;
use crate::store::CpuRecord;
use inventory_types::{CpuFact, CpuFunction, UpsertSummary, is_hyperthreaded};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

impl Reconciler {
    /// Compare the reported topology with the stored one. An identical
    /// topology writes nothing; any difference recreates every CPU row.
    pub async fn cpus_update_by_host(&self, uuid: Uuid, cpus: Vec<CpuFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let entry = inner.entry_mut(uuid)?;

        let previous: Vec<_> = entry.facts.cpus.values().map(|r| r.fact.topology_key()).collect();
        let mut reported: Vec<_> = cpus.iter().map(CpuFact::topology_key).collect();
        reported.sort_unstable();

        if previous == reported {
            debug!("cpu topology of {} unchanged", entry.host.display_name());
            return Ok(UpsertSummary {
                unchanged: len_u32(cpus.len()),
                ..UpsertSummary::default()
            });
        }

        let controller = entry.host.has_subfunction("controller");
        let worker = entry.host.has_subfunction("worker");
        info!(
            "cpu topology of {} changed ({} -> {} cpus, hyperthreading {}), reallocating",
            entry.host.display_name(),
            previous.len(),
            cpus.len(),
            if is_hyperthreaded(&cpus) { "on" } else { "off" }
        );

        let records = allocate_functions(&cpus, &self.config.cpu, controller, worker);
        let summary = UpsertSummary {
            created: len_u32(records.len()),
            deleted: len_u32(previous.len()),
            ..UpsertSummary::default()
        };
        entry.facts.cpus = records.into_iter().map(|r| (r.fact.cpu, r)).collect();

        inner.record_writes(summary.writes());
        Ok(summary)
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Assign a role to every logical CPU.
///
/// Roles are handed out per physical core, in (NUMA node, core) order, so
/// hyperthread siblings always share a role. On hosts without the worker
/// subfunction every core is a platform core. Otherwise NUMA node 0 gets the
/// platform cores first and then the vswitch cores; every node then gets
/// its shared cores; all remaining cores are application cores.
pub fn allocate_functions(
    cpus: &[CpuFact],
    policy: &CpuAllocationConfig,
    controller: bool,
    worker: bool,
) -> Vec<CpuRecord> {
    let platform_cores = if controller {
        policy.platform_cores_controller
    } else {
        policy.platform_cores_other
    };

    // (numa, core) -> role
    let mut cores: BTreeMap<(u32, u32), CpuFunction> = cpus
        .iter()
        .map(|c| ((c.numa_node, c.core), CpuFunction::Application))
        .collect();

    let mut per_node: BTreeMap<u32, u32> = BTreeMap::new();
    for ((numa, _), function) in cores.iter_mut() {
        let index = per_node.entry(*numa).or_insert(0);
        *function = if !worker {
            CpuFunction::Platform
        } else {
            role_for_core(*numa, *index, platform_cores, policy)
        };
        *index += 1;
    }

    let mut ordered: Vec<&CpuFact> = cpus.iter().collect();
    ordered.sort_by_key(|c| (c.numa_node, c.core, c.thread, c.cpu));
    ordered
        .into_iter()
        .map(|fact| CpuRecord {
            fact: fact.clone(),
            function: cores
                .get(&(fact.numa_node, fact.core))
                .copied()
                .unwrap_or(CpuFunction::Application),
        })
        .collect()
}

fn role_for_core(numa: u32, index: u32, platform_cores: u32, policy: &CpuAllocationConfig) -> CpuFunction {
    let mut index = index;
    if numa == 0 {
        if index < platform_cores {
            return CpuFunction::Platform;
        }
        index -= platform_cores;
        if index < policy.vswitch_cores {
            return CpuFunction::Vswitch;
        }
        index -= policy.vswitch_cores;
    }
    if index < policy.shared_cores {
        return CpuFunction::Shared;
    }
    CpuFunction::Application
}
