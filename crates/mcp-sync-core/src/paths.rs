use directories::ProjectDirs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct McpSyncPaths {
    pub runtime_directory: PathBuf,
    pub store_path: PathBuf,
    pub settings_path: PathBuf,
    pub audit_log_path: PathBuf,
}

impl McpSyncPaths {
    pub fn detect() -> Self {
        let mut paths = Self::from_runtime(detect_runtime_directory());
        if let Some(store) = non_empty_env("MCP_SYNC_STORE") {
            paths.store_path = PathBuf::from(store);
        }
        paths
    }

    pub fn from_runtime(runtime_directory: PathBuf) -> Self {
        let store_path = runtime_directory.join("mcp.json");
        let settings_path = runtime_directory.join("settings.json");
        let audit_log_path = runtime_directory.join("audit-log.json");
        Self {
            runtime_directory,
            store_path,
            settings_path,
            audit_log_path,
        }
    }

    pub fn ensure_runtime_dir(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.runtime_directory)
    }
}

fn detect_runtime_directory() -> PathBuf {
    if let Some(override_dir) = non_empty_env("MCP_SYNC_HOME") {
        return PathBuf::from(override_dir);
    }

    if let Some(project_dirs) = ProjectDirs::from("dev", "mcp-sync", "mcp-sync") {
        return project_dirs.config_dir().to_path_buf();
    }

    if let Some(home) = home_dir() {
        return home.join(".mcp-sync");
    }

    PathBuf::from(".mcp-sync")
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
}

/// Absolute, symlink-resolved form of a project path when it exists on disk.
pub fn standardized(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::McpSyncPaths;
    use std::path::PathBuf;

    #[test]
    fn runtime_layout_is_rooted_in_runtime_directory() {
        let paths = McpSyncPaths::from_runtime(PathBuf::from("/tmp/mcp-sync"));
        assert_eq!(paths.store_path, PathBuf::from("/tmp/mcp-sync/mcp.json"));
        assert_eq!(
            paths.settings_path,
            PathBuf::from("/tmp/mcp-sync/settings.json")
        );
        assert_eq!(
            paths.audit_log_path,
            PathBuf::from("/tmp/mcp-sync/audit-log.json")
        );
    }
}
