/// Compose model extraction
///
/// Reads the `services` section of a decoded compose document into service
/// definitions and partitions them into exposed (published host ports) and
/// internal services. Only `ports`, `expose` and `healthcheck` are looked at.

use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// A normalized port mapping from either short (`"8080:80"`) or long
/// (`{published, target}`) compose syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    /// Host side of the mapping, `None` when the engine picks a random port
    pub published: Option<u16>,
    pub target: u16,
}

/// One service as declared in the compose document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub ports: Vec<PortMapping>,
    /// Raw length of the `ports` list, malformed entries included
    pub declared_ports: usize,
    pub expose: Vec<u16>,
    pub healthcheck: bool,
}

impl ServiceDefinition {
    /// Exposed iff the service declares a non-empty `ports` list
    pub fn is_exposed(&self) -> bool {
        self.declared_ports > 0
    }

    /// First host-side port that can be resolved from the port mappings
    pub fn host_port(&self) -> Option<u16> {
        self.ports.iter().find_map(|p| p.published)
    }

    /// Port to probe from inside the container network.
    ///
    /// Prefers the target of the first port mapping, then the first `expose`
    /// entry. `None` means no internal port is known.
    pub fn internal_port(&self) -> Option<u16> {
        self.ports
            .first()
            .map(|p| p.target)
            .or_else(|| self.expose.first().copied())
    }
}

/// Service names split by exposure class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub exposed: BTreeSet<String>,
    pub internal: BTreeSet<String>,
}

impl Classification {
    /// Union of exposed and internal names, sorted
    pub fn service_names(&self) -> BTreeSet<&str> {
        self.exposed
            .iter()
            .chain(self.internal.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.exposed.contains(name)
    }

}

/// All service definitions of one compose document
#[derive(Debug, Clone, Default)]
pub struct ComposeModel {
    services: BTreeMap<String, ServiceDefinition>,
}

impl ComposeModel {
    /// Extract service definitions from a decoded compose document.
    ///
    /// Malformed port or expose entries are skipped with a warning; they never
    /// abort extraction of the other services.
    pub fn from_value(doc: &Value) -> Self {
        let mut services = BTreeMap::new();

        let Some(services_map) = doc.get("services").and_then(Value::as_mapping) else {
            return Self { services };
        };

        for (key, service) in services_map {
            let Some(name) = key.as_str() else {
                warn!(key = ?key, "Skipping service with non-string name");
                continue;
            };

            services.insert(name.to_string(), parse_service(name, service));
        }

        Self { services }
    }

    #[cfg(test)]
    pub fn from_definitions(definitions: impl IntoIterator<Item = ServiceDefinition>) -> Self {
        let services = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { services }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Partition services into exposed and internal
    pub fn classify(&self) -> Classification {
        let mut classification = Classification::default();
        for def in self.services.values() {
            if def.is_exposed() {
                classification.exposed.insert(def.name.clone());
            } else {
                classification.internal.insert(def.name.clone());
            }
        }
        classification
    }
}

fn parse_service(name: &str, service: &Value) -> ServiceDefinition {
    let mut ports = Vec::new();
    let mut declared_ports = 0;

    if let Some(entries) = service.get("ports").and_then(Value::as_sequence) {
        declared_ports = entries.len();
        for entry in entries {
            match parse_port_entry(entry) {
                Some(mapping) => ports.push(mapping),
                None => warn!(service = name, entry = ?entry, "Skipping malformed port entry"),
            }
        }
    }

    let expose = service
        .get("expose")
        .and_then(Value::as_sequence)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let port = port_value(entry);
                    if port.is_none() {
                        warn!(service = name, entry = ?entry, "Skipping malformed expose entry");
                    }
                    port
                })
                .collect()
        })
        .unwrap_or_default();

    let healthcheck = service.get("healthcheck").is_some();

    ServiceDefinition {
        name: name.to_string(),
        ports,
        declared_ports,
        expose,
        healthcheck,
    }
}

/// Normalize a single `ports` entry. Returns `None` for malformed entries.
pub fn parse_port_entry(entry: &Value) -> Option<PortMapping> {
    match entry {
        Value::String(spec) => {
            let mapping = parse_port_spec(spec)?;
            // A bare "80" is checked on the same port of the host
            if !spec.contains(':') && mapping.published.is_none() {
                return Some(PortMapping {
                    published: Some(mapping.target),
                    ..mapping
                });
            }
            Some(mapping)
        }
        Value::Number(_) => port_value(entry).map(|target| PortMapping {
            published: None,
            target,
        }),
        Value::Mapping(_) => {
            let target = entry.get("target").and_then(port_value)?;
            let published = match entry.get("published") {
                None | Some(Value::Null) => None,
                Some(value) => Some(port_value(value)?),
            };
            Some(PortMapping { published, target })
        }
        _ => None,
    }
}

/// Short syntax: `[HOST_IP:][HOST:]CONTAINER[/PROTO]`
pub fn parse_port_spec(spec: &str) -> Option<PortMapping> {
    let spec = spec.trim().split('/').next()?;

    // rsplitn keeps IPv6 host addresses like "[::1]" in the last piece
    let mut parts = spec.rsplitn(3, ':');
    let target = parse_port_number(parts.next()?)?;
    let published = match parts.next() {
        None | Some("") => None,
        Some(host) => Some(parse_port_number(host)?),
    };

    Some(PortMapping { published, target })
}

fn port_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => parse_port_number(s),
        _ => None,
    }
}

/// Parse "80", "80/tcp" or a range like "8000-8010" (first port wins)
fn parse_port_number(raw: &str) -> Option<u16> {
    raw.trim()
        .split('/')
        .next()?
        .split('-')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(yaml: &str) -> ComposeModel {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        ComposeModel::from_value(&doc)
    }

    #[test]
    fn test_short_and_long_port_syntax() {
        let m = model(
            r#"
services:
  web:
    ports:
      - "8080:80"
      - "127.0.0.1:9090:90/tcp"
      - "3000"
      - published: "5432"
        target: 5432
"#,
        );
        let web = m.get("web").unwrap();
        assert_eq!(
            web.ports,
            vec![
                PortMapping { published: Some(8080), target: 80 },
                PortMapping { published: Some(9090), target: 90 },
                PortMapping { published: Some(3000), target: 3000 },
                PortMapping { published: Some(5432), target: 5432 },
            ]
        );
        assert_eq!(web.host_port(), Some(8080));
        assert_eq!(web.internal_port(), Some(80));
    }

    #[test]
    fn test_malformed_ports_are_skipped() {
        let m = model(
            r#"
services:
  api:
    ports:
      - "not-a-port"
      - "99999:80"
      - { published: 8081 }
      - "8081:81"
  db:
    image: postgres
"#,
        );
        let api = m.get("api").unwrap();
        assert_eq!(api.declared_ports, 4);
        assert_eq!(api.ports, vec![PortMapping { published: Some(8081), target: 81 }]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_classification_ignores_expose() {
        let m = model(
            r#"
services:
  web:
    ports: ["8080:80"]
  db:
    expose: ["5432"]
  cache: {}
"#,
        );
        let c = m.classify();
        assert!(c.is_exposed("web"));
        assert!(c.internal.contains("db"));
        assert!(c.internal.contains("cache"));
        assert_eq!(c.service_names().into_iter().collect::<Vec<_>>(), vec!["cache", "db", "web"]);
    }

    #[test]
    fn test_internal_port_discovery() {
        let m = model(
            r#"
services:
  db:
    expose: ["5432/tcp", 6543]
  worker:
    image: busybox
  ranged:
    ports: ["8000-8001:80-81"]
"#,
        );
        assert_eq!(m.get("db").unwrap().internal_port(), Some(5432));
        assert_eq!(m.get("worker").unwrap().internal_port(), None);

        let ranged = m.get("ranged").unwrap();
        assert_eq!(ranged.host_port(), Some(8000));
        assert_eq!(ranged.internal_port(), Some(80));
    }

    #[test]
    fn test_bare_port_is_its_own_host_port() {
        let m = model(
            r#"
services:
  web:
    ports: ["80", "9000/udp", 7000]
"#,
        );
        let web = m.get("web").unwrap();
        assert_eq!(web.host_port(), Some(80));
        assert_eq!(web.internal_port(), Some(80));
        assert_eq!(web.ports[1], PortMapping { published: Some(9000), target: 9000 });
        assert_eq!(web.ports[2], PortMapping { published: None, target: 7000 });
    }

    #[test]
    fn test_healthcheck_flag() {
        let m = model(
            r#"
services:
  checked:
    healthcheck:
      test: ["CMD", "true"]
  disabled:
    healthcheck:
      disable: true
  plain:
    image: nginx
"#,
        );
        assert!(m.get("checked").unwrap().healthcheck);
        assert!(m.get("disabled").unwrap().healthcheck);
        assert!(!m.get("plain").unwrap().healthcheck);
    }

    #[test]
    fn test_missing_services_section() {
        let m = model("version: '3'\n");
        assert!(m.is_empty());
        assert!(m.classify().service_names().is_empty());
    }
}
