/// Domain errors raised by devmate collaborators
///
/// Command handlers work with `anyhow::Result`; these variants carry the
/// conditions callers may want to match on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevmateError {
    /// Neither a Compose file nor a Dockerfile exists in the project directory
    #[error("No Compose file or Dockerfile found in {}", .0.display())]
    ConfigurationAbsent(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Docker Compose file not found in {}", .0.display())]
    ComposeFileMissing(PathBuf),

    #[error("Dockerfile not found in {}", .0.display())]
    DockerfileMissing(PathBuf),

    /// Container name already taken and `--force` was not given
    #[error("Container already exists: {0} (use --force to replace it)")]
    ContainerExists(String),

    #[error("Directory is not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    #[error("Cannot derive a repository name from URL: {0}")]
    InvalidRepositoryUrl(String),

    /// External command (docker, git) exited with a failure status
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}
