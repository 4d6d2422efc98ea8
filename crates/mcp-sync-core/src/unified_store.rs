use crate::error::McpSyncError;
use crate::files::{atomic_write, read_optional};
use crate::models::{Registry, ServerRecord};
use crate::paths::McpSyncPaths;
use std::path::{Path, PathBuf};

/// Canonical registry of server definitions, the single source of truth.
#[derive(Debug, Clone)]
pub struct UnifiedStore {
    path: PathBuf,
}

impl Default for UnifiedStore {
    fn default() -> Self {
        Self::new(McpSyncPaths::detect().store_path)
    }
}

impl UnifiedStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Missing or unparsable stores are errors, never replaced silently.
    pub fn load(&self) -> Result<Registry, McpSyncError> {
        let Some(raw) = read_optional(&self.path)? else {
            return Err(McpSyncError::StoreMissing(self.path.clone()));
        };
        if raw.trim().is_empty() {
            return Err(McpSyncError::StoreCorrupt {
                path: self.path.clone(),
                reason: String::from("file is empty"),
            });
        }
        serde_json::from_str(&raw).map_err(|error| McpSyncError::StoreCorrupt {
            path: self.path.clone(),
            reason: error.to_string(),
        })
    }

    /// Returns whether the file was rewritten.
    pub fn save(&self, registry: &Registry) -> Result<bool, McpSyncError> {
        let mut payload = serde_json::to_vec_pretty(registry)?;
        payload.push(b'\n');

        if let Some(existing) = read_optional(&self.path)? {
            if existing.as_bytes() == payload.as_slice() {
                return Ok(false);
            }
        }
        atomic_write(&self.path, &payload)?;
        Ok(true)
    }

    /// Creates an empty store. An existing file is left alone.
    pub fn init(&self) -> Result<bool, McpSyncError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&Registry::default())
    }
}

/// Copy of a record with `_meta` removed, as handed to provider adapters.
pub fn strip_meta(record: &ServerRecord) -> ServerRecord {
    record.strip_meta()
}

#[cfg(test)]
mod tests {
    use super::{strip_meta, UnifiedStore};
    use crate::error::McpSyncError;
    use crate::models::{ConnectionSpec, EnabledState, Registry, ServerRecord};

    #[test]
    fn load_reports_missing_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = UnifiedStore::new(temp.path().join("mcp.json"));
        assert!(matches!(store.load(), Err(McpSyncError::StoreMissing(_))));
    }

    #[test]
    fn load_reports_corrupt_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("mcp.json");
        std::fs::write(&path, "{ not json").expect("write");
        let error = UnifiedStore::new(path).load().expect_err("must fail");
        assert!(matches!(error, McpSyncError::StoreCorrupt { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn init_does_not_overwrite_existing_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("mcp.json");
        let store = UnifiedStore::new(path.clone());
        assert!(store.init().expect("init"));

        let mut registry = store.load().expect("load");
        registry.servers.insert(
            String::from("fs"),
            ServerRecord::new(ConnectionSpec::stdio("npx", &["-y", "fs"])),
        );
        store.save(&registry).expect("save");

        assert!(!store.init().expect("second init"));
        assert!(store.load().expect("reload").contains("fs"));
    }

    #[test]
    fn save_skips_identical_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = UnifiedStore::new(temp.path().join("mcp.json"));
        let mut registry = Registry::default();
        let mut record = ServerRecord::new(ConnectionSpec::stdio("node", &["a.js"]));
        record
            .meta
            .enabled
            .insert(String::from("gemini"), EnabledState::Global(true));
        registry.servers.insert(String::from("a"), record);

        assert!(store.save(&registry).expect("first save"));
        assert!(!store.save(&registry).expect("second save"));
    }

    #[test]
    fn strip_meta_drops_bookkeeping() {
        let mut record = ServerRecord::new(ConnectionSpec::stdio("node", &[]));
        record
            .meta
            .enabled
            .insert(String::from("codex"), EnabledState::Global(false));
        let stripped = strip_meta(&record);
        assert!(stripped.meta.is_empty());
        assert_eq!(stripped.spec, record.spec);

        let rendered = serde_json::to_string(&stripped).expect("render");
        assert!(!rendered.contains("_meta"));
    }
}
