use super::json_doc::{
    child_object_mut, load_root, object_mut, parse_servers, save_root, servers_map, spec_from_json,
    spec_to_json, JsonDialect,
};
use super::{home_file, settle_install, Confirmer, McpProvider};
use crate::error::McpSyncError;
use crate::models::{ConnectionSpec, EnabledState, Registry, WriteResult};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct GeminiProvider {
    path: PathBuf,
    confirmer: Arc<dyn Confirmer>,
}

impl GeminiProvider {
    pub fn new(home: &Path, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            path: home_file(home, &[".gemini", "settings.json"]),
            confirmer,
        }
    }

    fn set_flag(entry: &mut JsonMap<String, JsonValue>, enabled: bool) -> bool {
        let currently_disabled = entry
            .get("disabled")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        if enabled {
            entry.remove("disabled").is_some()
        } else if currently_disabled {
            false
        } else {
            entry.insert("disabled".to_string(), JsonValue::Bool(true));
            true
        }
    }

    fn set_enabled(&self, names: &[String], enabled: bool) -> Result<WriteResult, McpSyncError> {
        let mut root = load_root(&self.path)?;
        let root_obj = object_mut(&self.path, &mut root, "root")?;
        let Some(servers) = root_obj.get_mut("mcpServers") else {
            return Ok(WriteResult::NoChanges);
        };
        let servers = object_mut(&self.path, servers, "mcpServers")?;

        let mut changed = false;
        for name in names {
            let Some(entry) = servers.get_mut(name) else {
                tracing::warn!(provider = self.id(), server = %name, "server not installed");
                continue;
            };
            let entry = object_mut(&self.path, entry, name)?;
            changed |= Self::set_flag(entry, enabled);
        }

        if changed {
            save_root(&self.path, &root)?;
        }
        Ok(WriteResult::from_changed(changed))
    }
}

impl McpProvider for GeminiProvider {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn config_path(&self) -> &Path {
        &self.path
    }

    fn list_servers(&self) -> Result<BTreeMap<String, ConnectionSpec>, McpSyncError> {
        let root = load_root(&self.path)?;
        Ok(servers_map(&self.path, &root)?
            .map(|map| parse_servers(map, JsonDialect::Gemini))
            .unwrap_or_default())
    }

    fn observed_state(&self, name: &str) -> Result<Option<EnabledState>, McpSyncError> {
        let root = load_root(&self.path)?;
        Ok(servers_map(&self.path, &root)?
            .and_then(|map| map.get(name))
            .map(|entry| {
                let disabled = entry
                    .get("disabled")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
                EnabledState::Global(!disabled)
            }))
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
            .and_then(|value| spec_from_json(value, JsonDialect::Gemini));
        if let Some(settled) =
            settle_install(self.confirmer.as_ref(), self.display_name(), name, existing.as_ref(), spec)?
        {
            return Ok(settled);
        }

        servers.insert(
            name.to_string(),
            spec_to_json(spec, JsonDialect::Gemini, current.as_ref()),
        );
        save_root(&self.path, &root)?;
        Ok(WriteResult::Applied)
    }

    fn enable_servers(
        &self,
        names: &[String],
        _project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        self.set_enabled(names, true)
    }

    fn disable_servers(
        &self,
        names: &[String],
        _project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        self.set_enabled(names, false)
    }

    fn sync_servers(&self, registry: &Registry) -> Result<WriteResult, McpSyncError> {
        let mut root = load_root(&self.path)?;
        let root_obj = object_mut(&self.path, &mut root, "root")?;
        let Some(servers) = root_obj.get_mut("mcpServers") else {
            return Ok(WriteResult::NoChanges);
        };
        let servers = object_mut(&self.path, servers, "mcpServers")?;

        let mut changed = false;
        for (name, record) in &registry.servers {
            if record.enabled_for(self.id()).is_none() {
                continue;
            }
            let Some(entry) = servers.get_mut(name) else {
                continue;
            };
            let enabled = self.is_server_enabled_in_meta(record);
            let entry = object_mut(&self.path, entry, name)?;
            changed |= Self::set_flag(entry, enabled);
        }

        if changed {
            save_root(&self.path, &root)?;
        }
        Ok(WriteResult::from_changed(changed))
    }

    fn supports_disabled_state(&self) -> bool {
        true
    }
}
