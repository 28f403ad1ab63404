/// Docker and Docker Compose integration
///
/// Reads go through the Docker API (bollard); lifecycle actions shell out to
/// the docker CLI so users see the same output they would get by hand.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogOutput, RemoveContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::{ContainerInspectResponse, ContainerSummary, HealthStatusEnum};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::project::PullPolicy;
use crate::core::runtime::{ContainerRuntime, LiveContainer, COMPOSE_WORKING_DIR_LABEL};
use crate::error::DevmateError;

#[derive(Clone)]
pub struct DockerManager {
    docker: Docker,
    exec_timeout: Duration,
}

impl DockerManager {
    /// Connect to the local Docker daemon
    pub fn new(exec_timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;

        Ok(Self {
            docker,
            exec_timeout,
        })
    }

    /// Check if Docker daemon is accessible
    pub async fn check_docker(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    /// Containers compose created for the project in `project_dir`, sorted by
    /// name so every listing of the same state has the same order
    pub async fn project_containers(&self, project_dir: &Path) -> Result<Vec<LiveContainer>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}={}", COMPOSE_WORKING_DIR_LABEL, project_dir.display())],
        );

        let options = Some(ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        });

        let containers = self
            .docker
            .list_containers(options)
            .await
            .context("Failed to list project containers")?;

        let mut live: Vec<LiveContainer> = containers
            .into_iter()
            .map(container_summary_to_live)
            .collect();
        live.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(count = live.len(), dir = %project_dir.display(), "Listed project containers");
        Ok(live)
    }

    /// Whether a container with this name exists (running or not)
    pub async fn container_exists(&self, name: &str) -> Result<bool> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError { status_code: 404, .. }) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to inspect container {}", name)),
        }
    }

    /// Stop and remove a container
    pub async fn remove_container(&self, name: &str) -> Result<()> {
        let options = Some(RemoveContainerOptions {
            force: true,
            ..Default::default()
        });

        self.docker
            .remove_container(name, options)
            .await
            .with_context(|| format!("Failed to remove container {}", name))
    }

    /// Run a command inside a container and wait for its exit code
    async fn exec_exit_code(&self, container: &str, cmd: &[String]) -> Result<i64> {
        let options = CreateExecOptions {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container, options)
            .await
            .with_context(|| format!("Failed to create exec in {}", container))?;

        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            // Drain output so the exec runs to completion
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdErr { message }) => {
                        debug!(container, stderr = %String::from_utf8_lossy(&message).trim(), "exec");
                    }
                    Ok(_) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(inspect.exit_code.unwrap_or(-1))
    }

    /// Run a docker CLI command and capture stdout
    async fn docker_command(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new("docker");
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .context("Failed to execute docker command")?;

        if !output.status.success() {
            return Err(DevmateError::CommandFailed {
                command: format!("docker {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a docker CLI command with output going straight to the terminal
    async fn docker_command_inherit(&self, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new("docker");
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let status = cmd
            .status()
            .await
            .context("Failed to execute docker command")?;

        if !status.success() {
            return Err(DevmateError::CommandFailed {
                command: format!("docker {}", args.join(" ")),
                stderr: status.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// `docker compose up -d --build` for a compose file
    pub async fn compose_up(
        &self,
        project_dir: &Path,
        compose_file: &Path,
        pull: PullPolicy,
        force_recreate: bool,
    ) -> Result<()> {
        let file = compose_file.to_string_lossy();
        let dir = project_dir.to_string_lossy();
        let mut args = vec![
            "compose",
            "-f",
            &*file,
            "--project-directory",
            &*dir,
            "up",
            "-d",
            "--build",
            "--pull",
            pull.as_str(),
        ];
        if force_recreate {
            args.push("--force-recreate");
        }
        self.docker_command_inherit(&args, Some(project_dir)).await
    }

    /// Show compose logs for a project
    pub async fn compose_logs(&self, project_dir: &Path, tail: usize, follow: bool) -> Result<()> {
        let tail_str = tail.to_string();
        let mut args = vec!["compose", "logs", "--tail", tail_str.as_str()];
        if follow {
            args.push("-f");
        }
        self.docker_command_inherit(&args, Some(project_dir)).await
    }

    /// Show logs of a single container
    pub async fn container_logs(&self, container: &str, tail: usize, follow: bool) -> Result<()> {
        let tail_str = tail.to_string();
        let mut args = vec!["logs", "--tail", tail_str.as_str()];
        if follow {
            args.push("-f");
        }
        args.push(container);
        self.docker_command_inherit(&args, None).await
    }

    /// Build `dir/Dockerfile` and tag it
    pub async fn build_image(&self, dir: &Path, tag: &str) -> Result<()> {
        let dockerfile = dir.join(crate::core::project::DOCKERFILE);
        let dockerfile = dockerfile.to_string_lossy();
        let context = dir.to_string_lossy();
        self.docker_command_inherit(
            &["build", "-t", tag, "-f", &*dockerfile, &*context],
            Some(dir),
        )
        .await
    }

    /// Start a detached container with published ports. Returns the container id.
    pub async fn run_container(&self, image: &str, name: &str, ports: &[String]) -> Result<String> {
        let mut args = vec!["run", "-d", "--name", name];
        for port in ports {
            args.push("-p");
            args.push(port);
        }
        args.push(image);

        let id = self.docker_command(&args, None).await?;
        Ok(id.trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerManager {
    async fn health_status(&self, container: &str) -> Result<Option<String>> {
        let inspect = within(
            self.exec_timeout,
            &format!("inspecting container {}", container),
            self.docker
                .inspect_container(container, None::<InspectContainerOptions>),
        )
        .await?
        .with_context(|| format!("Failed to inspect container {}", container))?;

        Ok(health_from_inspect(inspect))
    }

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<bool> {
        match tokio::time::timeout(self.exec_timeout, self.exec_exit_code(container, cmd)).await {
            Ok(Ok(code)) => Ok(code == 0),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(container, cmd = ?cmd, timeout = ?self.exec_timeout, "Exec timed out");
                Ok(false)
            }
        }
    }
}

/// Bound a daemon call; running out of time is an error naming `what`
async fn within<T>(limit: Duration, what: &str, fut: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("Timed out after {:?} {}", limit, what))
}

/// Health status string from an inspect response, `None` without a healthcheck
fn health_from_inspect(inspect: ContainerInspectResponse) -> Option<String> {
    let status = inspect
        .state
        .and_then(|state| state.health)
        .and_then(|health| health.status);

    match status {
        Some(HealthStatusEnum::HEALTHY) => Some("healthy".to_string()),
        Some(HealthStatusEnum::UNHEALTHY) => Some("unhealthy".to_string()),
        Some(HealthStatusEnum::STARTING) => Some("starting".to_string()),
        Some(HealthStatusEnum::NONE) | Some(HealthStatusEnum::EMPTY) | None => None,
    }
}

/// Convert a listing entry into the snapshot the health engine works on
fn container_summary_to_live(summary: ContainerSummary) -> LiveContainer {
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let running = summary.state.as_deref() == Some("running");

    LiveContainer {
        id: summary.id.unwrap_or_default(),
        name,
        labels: summary.labels.unwrap_or_default(),
        running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime::COMPOSE_SERVICE_LABEL;
    use bollard::models::{ContainerState, Health};

    fn inspect_with(status: Option<HealthStatusEnum>) -> ContainerInspectResponse {
        ContainerInspectResponse {
            state: Some(ContainerState {
                health: Some(Health {
                    status,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_within_times_out_hung_call() {
        let hung = std::future::pending::<()>();
        let err = within(Duration::from_millis(20), "inspecting container web-1", hung)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
        assert!(err.to_string().contains("inspecting container web-1"));

        let value = within(Duration::from_secs(1), "ready", async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_health_from_inspect() {
        assert_eq!(
            health_from_inspect(inspect_with(Some(HealthStatusEnum::HEALTHY))).as_deref(),
            Some("healthy")
        );
        assert_eq!(
            health_from_inspect(inspect_with(Some(HealthStatusEnum::STARTING))).as_deref(),
            Some("starting")
        );
        assert_eq!(health_from_inspect(inspect_with(Some(HealthStatusEnum::NONE))), None);
        assert_eq!(health_from_inspect(ContainerInspectResponse::default()), None);
    }

    #[test]
    fn test_summary_conversion() {
        let mut labels = HashMap::new();
        labels.insert(COMPOSE_SERVICE_LABEL.to_string(), "web".to_string());

        let summary = ContainerSummary {
            id: Some("abc123".to_string()),
            names: Some(vec!["/proj-web-1".to_string()]),
            labels: Some(labels),
            state: Some("running".to_string()),
            status: Some("Up 4 minutes (healthy)".to_string()),
            ..Default::default()
        };

        let live = container_summary_to_live(summary);
        assert_eq!(live.name, "proj-web-1");
        assert_eq!(live.service_name(), Some("web"));
        assert!(live.running);
    }

    #[tokio::test]
    async fn test_docker_manager_creation() {
        // This test requires Docker to be running
        if let Ok(manager) = DockerManager::new(Duration::from_secs(5)) {
            let _ = manager.check_docker().await;
        }
    }
}
