/// Helper utilities for the devmate CLI

use std::path::{Path, PathBuf};

/// Truncate string with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Check if a directory exists and has at least one entry
pub fn is_dir_non_empty<P: AsRef<Path>>(path: P) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Default container name for an image: `<name without tag>_app`
pub fn default_container_name(image: &str) -> String {
    let base = image.split(':').next().unwrap_or(image);
    let base = base.rsplit('/').next().unwrap_or(base);
    format!("{}_app", base)
}

/// Default image tag for a build directory: `<dirname>:latest`
pub fn default_image_name(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "app".to_string());
    format!("{}:latest", name)
}

/// Join a relative location onto a base directory, leaving absolute paths alone
pub fn join_location(base: &Path, location: &Path) -> PathBuf {
    if location.is_absolute() {
        location.to_path_buf()
    } else {
        base.join(location)
    }
}
