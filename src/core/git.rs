/// Git repository cloning

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::DevmateError;
use crate::utils::is_dir_non_empty;

/// Folder name for a clone: last URL segment without `.git`
pub fn repo_name(url: &str) -> Result<String> {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        return Err(DevmateError::InvalidRepositoryUrl(url.to_string()).into());
    }

    Ok(name.to_string())
}

/// Clone `url` into `dir`, which must be missing or empty
pub async fn clone_repo(url: &str, dir: &Path, branch: Option<&str>) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    if is_dir_non_empty(dir) {
        return Err(DevmateError::DirectoryNotEmpty(dir.to_path_buf()).into());
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone");
    if let Some(branch) = branch {
        cmd.args(["--branch", branch]);
    }
    cmd.arg(url).arg(dir);

    debug!(url, dir = %dir.display(), ?branch, "Cloning repository");

    let output = cmd.output().await.context("Failed to execute git")?;
    if !output.status.success() {
        return Err(DevmateError::CommandFailed {
            command: format!("git clone {}", url),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("https://github.com/acme/shop.git").unwrap(), "shop");
        assert_eq!(repo_name("https://github.com/acme/shop/").unwrap(), "shop");
        assert_eq!(repo_name("git@github.com:acme/shop.git").unwrap(), "shop");
        assert!(repo_name("").is_err());
    }

    #[tokio::test]
    async fn test_clone_refuses_non_empty_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "hi").unwrap();

        let err = clone_repo("https://example.invalid/repo.git", dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DevmateError>(),
            Some(DevmateError::DirectoryNotEmpty(_))
        ));
    }
}
