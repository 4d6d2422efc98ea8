use super::json_doc::{
    child_object_mut, load_root, object_mut, parse_servers, save_root, servers_map, spec_from_json,
    spec_to_json, JsonDialect, Remover,
};
use super::{home_file, settle_install, Confirmer, McpProvider};
use crate::error::McpSyncError;
use crate::models::{ConnectionSpec, EnabledState, Registry, WriteResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `~/.cursor/mcp.json`. Cursor has no disabled flag, so disabling a server
/// removes its definition and enabling relies on a prior install.
pub struct CursorProvider {
    path: PathBuf,
    confirmer: Arc<dyn Confirmer>,
}

impl CursorProvider {
    pub fn new(home: &Path, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            path: home_file(home, &[".cursor", "mcp.json"]),
            confirmer,
        }
    }

    fn remover(&self) -> Remover<'_> {
        Remover {
            path: &self.path,
            provider: self.id(),
            display_name: self.display_name(),
            confirmer: self.confirmer.as_ref(),
        }
    }
}

impl McpProvider for CursorProvider {
    fn id(&self) -> &'static str {
        "cursor"
    }

    fn display_name(&self) -> &'static str {
        "Cursor"
    }

    fn config_path(&self) -> &Path {
        &self.path
    }

    fn list_servers(&self) -> Result<BTreeMap<String, ConnectionSpec>, McpSyncError> {
        let root = load_root(&self.path)?;
        Ok(servers_map(&self.path, &root)?
            .map(|map| parse_servers(map, JsonDialect::Untyped))
            .unwrap_or_default())
    }

    fn observed_state(&self, name: &str) -> Result<Option<EnabledState>, McpSyncError> {
        let root = load_root(&self.path)?;
        Ok(servers_map(&self.path, &root)?
            .filter(|map| map.contains_key(name))
            .map(|_| EnabledState::Global(true)))
    }

    fn install_server(
        &self,
        name: &str,
        spec: &ConnectionSpec,
    ) -> Result<WriteResult, McpSyncError> {
        let mut root = load_root(&self.path)?;
        let root_obj = object_mut(&self.path, &mut root, "root")?;
        let servers = child_object_mut(&self.path, root_obj, "mcpServers")?;
        let current = servers.get(name).cloned();
        let existing = current
            .as_ref()
            .and_then(|value| spec_from_json(value, JsonDialect::Untyped));
        if let Some(settled) =
            settle_install(self.confirmer.as_ref(), self.display_name(), name, existing.as_ref(), spec)?
        {
            return Ok(settled);
        }

        servers.insert(
            name.to_string(),
            spec_to_json(spec, JsonDialect::Untyped, current.as_ref()),
        );
        save_root(&self.path, &root)?;
        Ok(WriteResult::Applied)
    }

    /// Presence is the enabled state; missing servers must be installed first.
    fn enable_servers(
        &self,
        names: &[String],
        _project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        let root = load_root(&self.path)?;
        let servers = servers_map(&self.path, &root)?;
        for name in names {
            if !servers.map(|map| map.contains_key(name)).unwrap_or(false) {
                tracing::warn!(provider = self.id(), server = %name, "server not installed");
            }
        }
        Ok(WriteResult::NoChanges)
    }

    fn disable_servers(
        &self,
        names: &[String],
        _project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        let root = load_root(&self.path)?;
        self.remover().remove(root, names)
    }

    fn sync_servers(&self, registry: &Registry) -> Result<WriteResult, McpSyncError> {
        let root = load_root(&self.path)?;
        let to_remove = registry
            .servers
            .iter()
            .filter(|(_, record)| record.enabled_for(self.id()).is_some())
            .filter(|(_, record)| !self.is_server_enabled_in_meta(record))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        self.remover().remove(root, &to_remove)
    }

    fn supports_disabled_state(&self) -> bool {
        false
    }
}
