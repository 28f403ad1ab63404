/// Health checking for compose services
///
/// Every declared service gets exactly one check, picked by fixed priority:
/// a native Docker healthcheck, then a probe of its published host port, then
/// a container-to-container probe from the probe source. Failures of the
/// engine or of a probe only affect the service being checked.

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::core::compose::{Classification, ComposeModel, ServiceDefinition};
use crate::core::correlate::Correlation;
use crate::core::docker::DockerManager;
use crate::core::net::TcpPortProbe;
use crate::core::project::load_compose;
use crate::core::report::{assemble, HealthReport};
use crate::core::runtime::{tcp_probe_command, ContainerRuntime, NetcatCapability, PortProbe};

const LOCALHOST: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    Native,
    Exposed,
    Internal,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Native => "Native",
            Strategy::Exposed => "Exposed",
            Strategy::Internal => "Internal",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
    Skipped,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "UP",
            HealthStatus::Down => "DOWN",
            HealthStatus::Skipped => "SKIPPED",
            HealthStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealthResult {
    pub name: String,
    pub strategy: Strategy,
    pub status: HealthStatus,
    pub details: String,
}

/// Strategy for a service: native beats exposed beats internal
pub fn select_strategy(def: &ServiceDefinition) -> Strategy {
    if def.healthcheck {
        Strategy::Native
    } else if def.is_exposed() {
        Strategy::Exposed
    } else {
        Strategy::Internal
    }
}

pub struct HealthChecker<'a> {
    runtime: &'a dyn ContainerRuntime,
    ports: &'a dyn PortProbe,
    probe_timeout: Duration,
}

impl<'a> HealthChecker<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        ports: &'a dyn PortProbe,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            ports,
            probe_timeout,
        }
    }

    /// Check every service in the classification. Always returns one result
    /// per service name, in name order.
    pub async fn check_all(
        &self,
        model: &ComposeModel,
        classification: &Classification,
        correlation: &Correlation,
    ) -> Vec<ServiceHealthResult> {
        let checks = classification
            .service_names()
            .into_iter()
            .map(|name| self.check_service(name, model, classification, correlation));

        // join_all keeps input order
        join_all(checks).await
    }

    async fn check_service(
        &self,
        name: &str,
        model: &ComposeModel,
        classification: &Classification,
        correlation: &Correlation,
    ) -> ServiceHealthResult {
        let Some(def) = model.get(name) else {
            error!(
                service = name,
                "Classified service is missing from the compose model; classification is out of sync"
            );
            let strategy = if classification.is_exposed(name) {
                Strategy::Exposed
            } else {
                Strategy::Internal
            };
            return ServiceHealthResult {
                name: name.to_string(),
                strategy,
                status: HealthStatus::Unknown,
                details: "service not found in analysis (classification out of sync)".to_string(),
            };
        };

        if def.is_exposed() != classification.is_exposed(name) {
            error!(service = name, "Exposure class disagrees with service definition");
        }

        let strategy = select_strategy(def);
        debug!(service = name, %strategy, "Checking service");

        let (status, details) = match strategy {
            Strategy::Native => self.check_native(name, correlation).await,
            Strategy::Exposed => self.check_exposed(def).await,
            Strategy::Internal => self.check_internal(def, correlation).await,
        };

        ServiceHealthResult {
            name: name.to_string(),
            strategy,
            status,
            details,
        }
    }

    async fn check_native(&self, name: &str, correlation: &Correlation) -> (HealthStatus, String) {
        let Some(container) = correlation.container_for(name) else {
            return (
                HealthStatus::Down,
                "container not found for native check".to_string(),
            );
        };

        // "starting" counts as DOWN, same as "unhealthy"
        match self.runtime.health_status(&container.name).await {
            Ok(Some(status)) if status == "healthy" => (
                HealthStatus::Up,
                "native Docker health check passed".to_string(),
            ),
            Ok(Some(status)) => (HealthStatus::Down, format!("native check: {}", status)),
            Ok(None) => (
                HealthStatus::Down,
                "native check: no health status reported".to_string(),
            ),
            Err(e) => {
                warn!(service = name, container = %container.name, error = %e, "Health query failed");
                (HealthStatus::Down, format!("native check failed: {:#}", e))
            }
        }
    }

    async fn check_exposed(&self, def: &ServiceDefinition) -> (HealthStatus, String) {
        let Some(port) = def.host_port() else {
            return (HealthStatus::Unknown, "no host port found".to_string());
        };

        let open = self.ports.is_open(LOCALHOST, port).await;
        let status = if open { HealthStatus::Up } else { HealthStatus::Down };
        let state = if open { "Port Open" } else { "Port Closed" };

        (status, format!("{}:{} ({})", LOCALHOST, port, state))
    }

    async fn check_internal(
        &self,
        def: &ServiceDefinition,
        correlation: &Correlation,
    ) -> (HealthStatus, String) {
        let Some(source) = correlation.probe_source.as_ref() else {
            return (
                HealthStatus::Skipped,
                "no source container for internal check".to_string(),
            );
        };

        let Some(port) = def.internal_port() else {
            return (HealthStatus::Unknown, "no internal port defined".to_string());
        };

        // Compose registers the service name as a network alias, so it is a
        // usable target even without a mapped container
        let target = correlation
            .container_for(&def.name)
            .map(|c| c.name.as_str())
            .unwrap_or(def.name.as_str());

        debug!(service = %def.name, target, port, source = %source.name, "Internal probe");

        let cmd = tcp_probe_command(target, port, self.probe_timeout);
        let route = format!("{}:{} from {}", target, port, source.name);

        match self.runtime.exec(&source.name, &cmd).await {
            Ok(true) => (HealthStatus::Up, route),
            Ok(false) => (HealthStatus::Down, route),
            Err(e) => {
                warn!(service = %def.name, error = %e, "Internal probe failed to run");
                (HealthStatus::Down, format!("{}: {:#}", route, e))
            }
        }
    }
}

/// Build the health report for a compose project that is already up
pub async fn project_health(
    docker: &DockerManager,
    project_dir: &Path,
    compose_file: &Path,
    probe_timeout: Duration,
) -> Result<HealthReport> {
    let document = load_compose(compose_file)?;
    let model = ComposeModel::from_value(&document);
    if model.is_empty() {
        warn!(file = %compose_file.display(), "Compose file declares no services");
    } else {
        debug!(services = model.len(), file = %compose_file.display(), "Loaded compose model");
    }
    let classification = model.classify();

    // A failed listing leaves every service uncorrelated instead of aborting
    let live = match docker.project_containers(project_dir).await {
        Ok(live) => live,
        Err(e) => {
            warn!(error = %e, "Could not list project containers");
            Vec::new()
        }
    };

    let capability = NetcatCapability::new(docker);
    let correlation = Correlation::build(&live, &classification, &capability).await;

    let ports = TcpPortProbe::new(probe_timeout);
    let checker = HealthChecker::new(docker, &ports, probe_timeout);
    let results = checker.check_all(&model, &classification, &correlation).await;

    Ok(assemble(results))
}
