/// Application configuration management
/// Stores user preferences in ~/.config/devmate/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::project::PullPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeout for host TCP probes and for `nc -w` inside containers
    #[serde(with = "humantime_duration")]
    pub probe_timeout: Duration,

    /// Upper bound on a single exec inside a container
    #[serde(with = "humantime_duration")]
    pub exec_timeout: Duration,

    pub pull: PullPolicy,

    pub health: HealthDefaults,
}

/// Defaults for the `health` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthDefaults {
    pub max_retries: u32,
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    #[serde(with = "humantime_duration")]
    pub delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            exec_timeout: Duration::from_secs(5),
            pull: PullPolicy::Missing,
            health: HealthDefaults::default(),
        }
    }
}

impl Default for HealthDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(5),
            delay: Duration::from_secs(1),
        }
    }
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join("devmate");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }
}

/// Durations written as "3s", "500ms", "1m 30s"
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_timeout = \"500ms\"").unwrap();
        writeln!(file, "pull = \"always\"").unwrap();
        writeln!(file, "[health]").unwrap();
        writeln!(file, "max_retries = 10").unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.probe_timeout, Duration::from_millis(500));
        assert_eq!(config.exec_timeout, Duration::from_secs(5));
        assert_eq!(config.pull, PullPolicy::Always);
        assert_eq!(config.health.max_retries, 10);
        assert_eq!(config.health.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_duration() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "exec_timeout = \"soon\"").unwrap();
        assert!(AppConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_round_trip_format() {
        let rendered = toml::to_string(&AppConfig::default()).unwrap();
        assert!(rendered.contains("probe_timeout = \"3s\""));
    }
}
