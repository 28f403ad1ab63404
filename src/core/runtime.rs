/// Runtime collaborators used by the health engine
///
/// The engine only sees these traits. `DockerManager` backs `ContainerRuntime`,
/// `TcpPortProbe` backs `PortProbe`, and `NetcatCapability` backs
/// `CapabilityProbe`.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Label compose puts on every container it creates, naming the service
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// Label compose sets to the project working directory
pub const COMPOSE_WORKING_DIR_LABEL: &str = "com.docker.compose.project.working_dir";

/// A container as seen in one listing snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveContainer {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub running: bool,
}

impl LiveContainer {
    /// Compose service this container belongs to, if labelled
    pub fn service_name(&self) -> Option<&str> {
        self.labels.get(COMPOSE_SERVICE_LABEL).map(String::as_str)
    }
}

/// Queries against the container engine
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Current health status string of a container (`healthy`, `unhealthy`,
    /// `starting`), `None` when the container has no healthcheck
    async fn health_status(&self, container: &str) -> Result<Option<String>>;

    /// Run a command inside a container. `Ok(true)` on exit status 0; a
    /// timeout is reported as `Ok(false)`.
    async fn exec(&self, container: &str, cmd: &[String]) -> Result<bool>;
}

/// Reachability of a TCP port from this host
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn is_open(&self, host: &str, port: u16) -> bool;
}

/// Whether a container can issue network probes against its peers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn has_network_tool(&self, container: &str) -> bool;
}

/// Presence checks for `nc`, tried in order. Minimal images lack one or
/// another of these helpers.
const NETCAT_PRESENCE_CHECKS: &[&[&str]] = &[
    &["sh", "-c", "command -v nc"],
    &["which", "nc"],
    &["nc", "-h"],
];

/// Detects netcat inside a container by exec'ing presence checks
pub struct NetcatCapability<'a> {
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> NetcatCapability<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl CapabilityProbe for NetcatCapability<'_> {
    async fn has_network_tool(&self, container: &str) -> bool {
        for variant in NETCAT_PRESENCE_CHECKS {
            let cmd: Vec<String> = variant.iter().map(|s| s.to_string()).collect();
            match self.runtime.exec(container, &cmd).await {
                Ok(true) => {
                    debug!(container, check = ?variant, "Found nc");
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!(container, check = ?variant, error = %e, "nc presence check errored"),
            }
        }

        debug!(container, "No nc available");
        false
    }
}

/// Command run inside the probe source to test `host:port`
pub fn tcp_probe_command(host: &str, port: u16, timeout: Duration) -> Vec<String> {
    let wait = timeout.as_secs().max(1);
    vec![
        "nc".to_string(),
        "-z".to_string(),
        "-w".to_string(),
        wait.to_string(),
        host.to_string(),
        port.to_string(),
    ]
}
