/// Correlation of declared services with live containers
///
/// Built once per report from an immutable listing snapshot so that the
/// service map and the probe source cannot shift while services are resolved.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core::compose::Classification;
use crate::core::runtime::{CapabilityProbe, LiveContainer};

/// Service name -> the live container running it
pub type ServiceContainerMap = BTreeMap<String, LiveContainer>;

#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub containers: ServiceContainerMap,
    /// Origin for container-to-container probes, `None` when no container
    /// can run them
    pub probe_source: Option<LiveContainer>,
}

impl Correlation {
    /// Correlate a container listing with the classified services
    pub async fn build(
        live: &[LiveContainer],
        classification: &Classification,
        capability: &dyn CapabilityProbe,
    ) -> Self {
        let containers = map_services(live);
        let probe_source = select_probe_source(live, classification, capability).await;

        match &probe_source {
            Some(source) => info!(container = %source.name, "Selected probe source"),
            None => info!("No container can run internal probes"),
        }

        Self {
            containers,
            probe_source,
        }
    }

    pub fn container_for(&self, service: &str) -> Option<&LiveContainer> {
        self.containers.get(service)
    }
}

/// Map service names to containers through the compose service label.
/// The first container listed for a service wins.
pub fn map_services(live: &[LiveContainer]) -> ServiceContainerMap {
    let mut map = ServiceContainerMap::new();

    for container in live {
        let Some(service) = container.service_name() else {
            debug!(container = %container.name, "Container has no compose service label");
            continue;
        };

        if let Some(existing) = map.get(service) {
            warn!(
                service,
                kept = %existing.name,
                ignored = %container.name,
                "Several containers for one service"
            );
            continue;
        }

        map.insert(service.to_string(), container.clone());
    }

    map
}

/// Pick the container internal probes are issued from.
///
/// Walks the listing in order. Containers that are not running or lack a
/// network probe tool are skipped. The first capable container backing an
/// exposed service wins; otherwise the first capable container seen.
/// Capability is checked at most once per container.
pub async fn select_probe_source(
    live: &[LiveContainer],
    classification: &Classification,
    capability: &dyn CapabilityProbe,
) -> Option<LiveContainer> {
    let mut fallback: Option<&LiveContainer> = None;

    for container in live {
        if !container.running {
            continue;
        }

        if !capability.has_network_tool(&container.name).await {
            continue;
        }

        if container
            .service_name()
            .is_some_and(|service| classification.is_exposed(service))
        {
            return Some(container.clone());
        }

        if fallback.is_none() {
            fallback = Some(container);
        }
    }

    fallback.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime::{MockCapabilityProbe, COMPOSE_SERVICE_LABEL};
    use std::collections::{BTreeSet, HashMap};

    fn container(name: &str, service: Option<&str>) -> LiveContainer {
        let mut labels = HashMap::new();
        if let Some(service) = service {
            labels.insert(COMPOSE_SERVICE_LABEL.to_string(), service.to_string());
        }
        LiveContainer {
            id: format!("id-{name}"),
            name: name.to_string(),
            labels,
            running: true,
        }
    }

    fn classification(exposed: &[&str], internal: &[&str]) -> Classification {
        Classification {
            exposed: exposed.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            internal: internal.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn capable(names: &'static [&'static str]) -> MockCapabilityProbe {
        let mut probe = MockCapabilityProbe::new();
        probe
            .expect_has_network_tool()
            .returning(move |name| names.contains(&name));
        probe
    }

    #[test]
    fn test_first_container_wins() {
        let live = vec![
            container("proj-web-1", Some("web")),
            container("proj-web-2", Some("web")),
            container("stray", None),
            container("proj-db-1", Some("db")),
        ];
        let map = map_services(&live);
        assert_eq!(map.len(), 2);
        assert_eq!(map["web"].name, "proj-web-1");
        assert_eq!(map["db"].name, "proj-db-1");
    }

    #[tokio::test]
    async fn test_prefers_exposed_source() {
        let live = vec![
            container("proj-worker-1", Some("worker")),
            container("proj-web-1", Some("web")),
        ];
        let probe = capable(&["proj-worker-1", "proj-web-1"]);
        let source = select_probe_source(&live, &classification(&["web"], &["worker"]), &probe).await;
        assert_eq!(source.unwrap().name, "proj-web-1");
    }

    #[tokio::test]
    async fn test_falls_back_to_first_capable() {
        let live = vec![
            container("proj-web-1", Some("web")),
            container("proj-worker-1", Some("worker")),
            container("proj-cache-1", Some("cache")),
        ];
        // web has no nc, so the first capable internal container is used
        let probe = capable(&["proj-worker-1", "proj-cache-1"]);
        let source =
            select_probe_source(&live, &classification(&["web"], &["worker", "cache"]), &probe).await;
        assert_eq!(source.unwrap().name, "proj-worker-1");
    }

    #[tokio::test]
    async fn test_no_capable_container() {
        let live = vec![container("proj-db-1", Some("db"))];
        let probe = capable(&[]);
        let source = select_probe_source(&live, &classification(&[], &["db"]), &probe).await;
        assert!(source.is_none());
    }

    #[tokio::test]
    async fn test_capability_checked_once_and_skips_stopped() {
        let mut stopped = container("proj-old-1", Some("old"));
        stopped.running = false;
        let live = vec![
            stopped,
            container("proj-a-1", Some("a")),
            container("proj-b-1", Some("b")),
        ];

        let mut probe = MockCapabilityProbe::new();
        probe
            .expect_has_network_tool()
            .withf(|name| name == "proj-a-1")
            .times(1)
            .return_const(true);
        probe
            .expect_has_network_tool()
            .withf(|name| name == "proj-b-1")
            .times(1)
            .return_const(true);

        let source = select_probe_source(&live, &classification(&["b"], &["a", "old"]), &probe).await;
        assert_eq!(source.unwrap().name, "proj-b-1");
    }

    #[tokio::test]
    async fn test_selection_is_deterministic() {
        let live = vec![
            container("proj-api-1", Some("api")),
            container("proj-web-1", Some("web")),
            container("proj-db-1", Some("db")),
        ];
        let classes = classification(&["api", "web"], &["db"]);

        let mut picks = Vec::new();
        for _ in 0..3 {
            let probe = capable(&["proj-web-1", "proj-db-1", "proj-api-1"]);
            let correlation = Correlation::build(&live, &classes, &probe).await;
            picks.push(correlation.probe_source.unwrap().name);
        }
        assert!(picks.iter().all(|p| p == "proj-api-1"));
    }
}
