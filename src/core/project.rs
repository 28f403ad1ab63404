/// Project configuration detection
///
/// Finds out whether a directory is a Compose project, a Dockerfile project,
/// or neither, and loads the compose document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DevmateError;

/// Compose file names recognized during detection
const COMPOSE_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Lookup order when picking the file to bring up
const COMPOSE_CANDIDATES: &[&str] = &[
    "docker-compose.yaml",
    "docker-compose.yml",
    "compose.yaml",
    "compose.yml",
];

pub const DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    Compose,
    Dockerfile,
    None,
}

/// Image pull policy passed to `docker compose up --pull`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    #[default]
    Missing,
    Never,
    Always,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Missing => "missing",
            PullPolicy::Never => "never",
            PullPolicy::Always => "always",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute, symlink-free form of a project path
pub fn resolve_project_dir(path: &Path) -> Result<PathBuf> {
    let dir = fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))?;

    if !dir.is_dir() {
        return Err(DevmateError::NotADirectory(dir).into());
    }

    Ok(dir)
}

/// Compose files take precedence over a Dockerfile
pub fn detect_configuration(path: &Path) -> Result<ConfigType> {
    let dir = resolve_project_dir(path)?;

    if COMPOSE_FILES.iter().any(|f| dir.join(f).exists()) {
        return Ok(ConfigType::Compose);
    }

    if dir.join(DOCKERFILE).exists() {
        return Ok(ConfigType::Dockerfile);
    }

    Ok(ConfigType::None)
}

/// Locate the compose file to use, honoring an explicit file name first
pub fn find_compose_file(dir: &Path, explicit: Option<&str>) -> Result<PathBuf> {
    explicit
        .into_iter()
        .chain(COMPOSE_CANDIDATES.iter().copied())
        .map(|name| dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| anyhow::Error::from(DevmateError::ComposeFileMissing(dir.to_path_buf())))
}

/// Read and decode a compose file
pub fn load_compose(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_compose_over_dockerfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        assert_eq!(detect_configuration(dir.path()).unwrap(), ConfigType::Dockerfile);

        fs::write(dir.path().join("compose.yml"), "services: {}\n").unwrap();
        assert_eq!(detect_configuration(dir.path()).unwrap(), ConfigType::Compose);
    }

    #[test]
    fn test_detect_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_configuration(dir.path()).unwrap(), ConfigType::None);
    }

    #[test]
    fn test_detect_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("compose.yml");
        fs::write(&file, "services: {}\n").unwrap();

        let err = detect_configuration(&file).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DevmateError>(),
            Some(DevmateError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_find_compose_file_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("compose.yaml"), "services: {}\n").unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(dir.path().join("custom.yml"), "services: {}\n").unwrap();

        let found = find_compose_file(dir.path(), None).unwrap();
        assert_eq!(found.file_name().unwrap(), "docker-compose.yml");

        let found = find_compose_file(dir.path(), Some("custom.yml")).unwrap();
        assert_eq!(found.file_name().unwrap(), "custom.yml");

        let found = find_compose_file(dir.path(), Some("missing.yml")).unwrap();
        assert_eq!(found.file_name().unwrap(), "docker-compose.yml");
    }

    #[test]
    fn test_load_compose() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compose.yml");
        fs::write(&path, "services:\n  web:\n    ports: ['8080:80']\n").unwrap();

        let doc = load_compose(&path).unwrap();
        assert!(doc.get("services").and_then(|s| s.get("web")).is_some());
    }
}
