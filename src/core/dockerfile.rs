/// Dockerfile port planning
///
/// Reads `EXPOSE` directives and reconciles them with user supplied
/// `HOST:CONTAINER` mappings before `docker run`.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::core::compose::parse_port_spec;

/// Ports exposed by a Dockerfile
pub fn exposed_ports(dockerfile: &Path) -> Result<Vec<u16>> {
    let content = fs::read_to_string(dockerfile)
        .with_context(|| format!("Failed to read {}", dockerfile.display()))?;
    Ok(parse_exposed_ports(&content))
}

/// Parse `EXPOSE` lines. Protocol suffixes are dropped, variables and
/// other non-numeric values are skipped, duplicates removed.
pub fn parse_exposed_ports(content: &str) -> Vec<u16> {
    static EXPOSE_RE: OnceLock<Regex> = OnceLock::new();
    let re = EXPOSE_RE.get_or_init(|| Regex::new(r"(?im)^\s*EXPOSE\s+(.+)$").unwrap());

    let mut ports = Vec::new();
    for caps in re.captures_iter(content) {
        for item in caps[1].split_whitespace() {
            let Some(port) = item.split('/').next().and_then(|p| p.parse::<u16>().ok()) else {
                continue;
            };
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
    }
    ports
}

/// Final `-p` mappings for `docker run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortPlan {
    pub mappings: Vec<String>,
    /// Mapped container ports the Dockerfile does not expose
    pub warnings: Vec<String>,
    /// Mappings added for exposed ports the user left out
    pub added: Vec<String>,
}

/// Reconcile user mappings with the exposed ports.
///
/// Without user mappings every exposed port is mapped to the same host port.
/// With user mappings, exposed ports left unmapped are appended.
pub fn plan_port_mappings(exposed: &[u16], user: &[String]) -> PortPlan {
    if exposed.is_empty() {
        return PortPlan {
            mappings: user.to_vec(),
            ..Default::default()
        };
    }

    if user.is_empty() {
        return PortPlan {
            mappings: exposed.iter().map(|p| format!("{p}:{p}")).collect(),
            ..Default::default()
        };
    }

    let exposed_list = exposed
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let mut plan = PortPlan {
        mappings: user.to_vec(),
        ..Default::default()
    };
    let mut mapped = Vec::new();

    for spec in user {
        let Some(mapping) = parse_port_spec(spec) else {
            continue;
        };
        if mapping.published.is_none() {
            continue;
        }
        mapped.push(mapping.target);
        if !exposed.contains(&mapping.target) {
            plan.warnings.push(format!(
                "Port {} is mapped but not exposed in Dockerfile (Exposed: {})",
                mapping.target, exposed_list
            ));
        }
    }

    for port in exposed {
        if !mapped.contains(port) {
            let mapping = format!("{port}:{port}");
            plan.mappings.push(mapping.clone());
            plan.added.push(mapping);
        }
    }

    plan
}

/// Host ports published by a list of mappings
pub fn host_ports(mappings: &[String]) -> Vec<u16> {
    mappings
        .iter()
        .filter_map(|m| parse_port_spec(m))
        .filter_map(|m| m.published)
        .collect()
}
