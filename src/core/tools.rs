/// Presence checks for the command line tools devmate relies on

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A tool `init` checks for, with an install hint
#[derive(Debug, Clone)]
pub struct RequiredTool {
    pub display_name: &'static str,
    /// Executable names, any one of which satisfies the requirement
    pub binaries: &'static [&'static str],
    pub install_hint: &'static str,
}

pub const REQUIRED_TOOLS: &[RequiredTool] = &[
    RequiredTool {
        display_name: "Git",
        binaries: &["git"],
        install_hint: "Install git from https://git-scm.com/",
    },
    RequiredTool {
        display_name: "Docker",
        binaries: &["docker"],
        install_hint: "Install Docker from https://www.docker.com/",
    },
    RequiredTool {
        display_name: "Python",
        binaries: &["python3", "python"],
        install_hint: "Install Python from https://www.python.org/",
    },
];

/// First executable named `tool` in a PATH-style list of directories
pub fn find_in_path(tool: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

/// Look a tool up on the current PATH
pub fn which(tool: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in_path(tool, &path_var)
}

/// Resolve a required tool to the first binary that is installed
pub fn locate(tool: &RequiredTool) -> Option<PathBuf> {
    tool.binaries.iter().find_map(|b| which(b))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
