//! LLDP agents and neighbours from `lldpcli -f keyvalue`.
//!
//! Output lines look like `lldp.eno1.chassis.mac=3c:fd:fe:00:00:01`.
//! Interface names may themselves contain dots (`eno1.100`), so the key is
//! split at the first known section name.

use crate::command::CommandRunner;
use crate::error::AgentError;
use inventory_types::{LldpAgentFact, LldpNeighbourFact};
use std::collections::BTreeMap;

const SECTIONS: &[&str] = &[
    "chassis", "port", "via", "rid", "age", "ttl", "status", "vlan", "ppvid", "pi", "lldp-med",
    "unknown-tlvs",
];

/// Local LLDP agents and the neighbours they hear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LldpFacts {
    pub agents: Vec<LldpAgentFact>,
    pub neighbours: Vec<LldpNeighbourFact>,
}

impl LldpFacts {
    /// Nothing heard and no local agent.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.neighbours.is_empty()
    }

    /// Add the entries of `self` that are not already in the given lists.
    /// Agents match by local port, neighbours by local port and MSAP.
    pub fn extend_missing(&self, agents: &mut Vec<LldpAgentFact>, neighbours: &mut Vec<LldpNeighbourFact>) {
        for agent in &self.agents {
            if !agents.iter().any(|a| a.port_name == agent.port_name) {
                agents.push(agent.clone());
            }
        }
        for neighbour in &self.neighbours {
            let known = neighbours
                .iter()
                .any(|n| n.port_name == neighbour.port_name && n.msap() == neighbour.msap());
            if !known {
                neighbours.push(neighbour.clone());
            }
        }
    }
}

/// Read local interfaces and neighbours through `lldpcli`.
pub async fn collect_lldp(runner: &dyn CommandRunner, lldpcli: &str) -> Result<LldpFacts, AgentError> {
    let local = runner
        .run(lldpcli, &["-f", "keyvalue", "show", "interfaces", "details"])
        .await?;
    let remote = runner
        .run(lldpcli, &["-f", "keyvalue", "show", "neighbors", "details"])
        .await?;
    Ok(LldpFacts {
        agents: parse_agents(&local),
        neighbours: parse_neighbours(&remote),
    })
}

type Fields = BTreeMap<String, String>;

/// Interface → (section key → first value).
fn parse_keyvalue(text: &str) -> BTreeMap<String, Fields> {
    let mut interfaces: BTreeMap<String, Fields> = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let Some(rest) = key.trim().strip_prefix("lldp.") else {
            continue;
        };
        let Some((interface, field)) = split_interface(rest) else {
            continue;
        };
        interfaces
            .entry(interface.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| value.trim().to_string());
    }
    interfaces
}

fn split_interface(key: &str) -> Option<(&str, &str)> {
    key.match_indices('.')
        .map(|(i, _)| i)
        .find(|&i| {
            let field = &key[i + 1..];
            SECTIONS.iter().any(|section| {
                field == *section
                    || field
                        .strip_prefix(section)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
        })
        .map(|i| (&key[..i], &key[i + 1..]))
}

fn first<'a>(fields: &'a Fields, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| fields.get(*k))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn identity(fields: &Fields) -> Option<(String, String)> {
    let chassis = first(fields, &["chassis.mac", "chassis.id", "chassis.ip", "chassis.local"])?;
    let port = first(fields, &["port.mac", "port.ifname", "port.local", "port.ip"])?;
    Some((chassis.to_string(), port.to_string()))
}

fn ttl(fields: &Fields) -> u32 {
    first(fields, &["port.ttl", "chassis.ttl", "ttl"])
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn parse_agents(text: &str) -> Vec<LldpAgentFact> {
    parse_keyvalue(text)
        .into_iter()
        .filter_map(|(port_name, fields)| {
            let (chassis_id, port_identifier) = identity(&fields)?;
            Some(LldpAgentFact {
                status: first(&fields, &["status"]).unwrap_or("rx-tx").to_string(),
                system_name: first(&fields, &["chassis.name"]).map(str::to_string),
                ttl: ttl(&fields),
                port_name,
                chassis_id,
                port_identifier,
            })
        })
        .collect()
}

fn parse_neighbours(text: &str) -> Vec<LldpNeighbourFact> {
    parse_keyvalue(text)
        .into_iter()
        .filter_map(|(port_name, fields)| {
            let (chassis_id, port_identifier) = identity(&fields)?;
            Some(LldpNeighbourFact {
                system_name: first(&fields, &["chassis.name"]).map(str::to_string),
                system_description: first(&fields, &["chassis.descr"]).map(str::to_string),
                port_description: first(&fields, &["port.descr"]).map(str::to_string),
                management_address: first(&fields, &["chassis.mgmt-ip"]).map(str::to_string),
                ttl: ttl(&fields),
                port_name,
                chassis_id,
                port_identifier,
            })
        })
        .collect()
}
