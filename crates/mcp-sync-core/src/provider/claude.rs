use super::json_doc::{
    child_object_mut, load_root, object_mut, parse_servers, save_root, servers_map, set_membership,
    spec_from_json, spec_to_json, JsonDialect, Remover,
};
use super::{home_file, settle_install, Confirmer, McpProvider};
use crate::error::McpSyncError;
use crate::models::{ConnectionSpec, EnabledState, Registry, WriteResult};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DISABLED_KEY: &str = "disabledMcpServers";

/// `~/.claude.json`: user-scope servers in the root `mcpServers`, and one
/// exclusion list per project under `projects.<path>.disabledMcpServers`.
/// Without any project there is nowhere to record an exclusion, so the
/// file behaves like a host without disabled state: off means removed.
pub struct ClaudeProvider {
    path: PathBuf,
    confirmer: Arc<dyn Confirmer>,
}

impl ClaudeProvider {
    pub fn new(home: &Path, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            path: home_file(home, &[".claude.json"]),
            confirmer,
        }
    }

    fn project_keys(&self, root: &JsonValue) -> Result<Vec<String>, McpSyncError> {
        match root.get("projects") {
            None => Ok(Vec::new()),
            Some(JsonValue::Object(projects)) => Ok(projects.keys().cloned().collect()),
            Some(_) => Err(McpSyncError::malformed(&self.path, "projects must be object")),
        }
    }

    fn disabled_in(&self, root: &JsonValue, project: &str) -> HashSet<String> {
        root.get("projects")
            .and_then(|projects| projects.get(project))
            .and_then(|project| project.get(DISABLED_KEY))
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn exclusion_list<'a>(
        &self,
        projects: &'a mut JsonMap<String, JsonValue>,
        project: &str,
    ) -> Result<&'a mut Vec<JsonValue>, McpSyncError> {
        let project_obj = child_object_mut(&self.path, projects, project)?;
        project_obj
            .entry(DISABLED_KEY.to_string())
            .or_insert_with(|| JsonValue::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| {
                McpSyncError::malformed(
                    &self.path,
                    format!("projects.{project}.{DISABLED_KEY} must be array"),
                )
            })
    }

    fn remover(&self) -> Remover<'_> {
        Remover {
            path: &self.path,
            provider: self.id(),
            display_name: self.display_name(),
            confirmer: self.confirmer.as_ref(),
        }
    }

    fn set_disabled(
        &self,
        names: &[String],
        project: Option<&str>,
        disabled: bool,
    ) -> Result<WriteResult, McpSyncError> {
        let mut root = load_root(&self.path)?;
        let known = self.project_keys(&root)?;
        let targets = match project {
            Some(project) if !known.iter().any(|item| item == project) => {
                return Err(McpSyncError::UnknownProject {
                    provider: self.id().to_string(),
                    project: project.to_string(),
                });
            }
            Some(project) => vec![project.to_string()],
            None => known,
        };

        if targets.is_empty() {
            if disabled {
                return self.remover().remove(root, names);
            }
            return Ok(WriteResult::NoChanges);
        }

        let root_obj = object_mut(&self.path, &mut root, "root")?;
        let projects = child_object_mut(&self.path, root_obj, "projects")?;
        let mut changed = false;
        for target in &targets {
            let list = self.exclusion_list(projects, target)?;
            for name in names {
                changed |= set_membership(list, name, disabled);
            }
        }

        if changed {
            save_root(&self.path, &root)?;
        }
        Ok(WriteResult::from_changed(changed))
    }
}

impl McpProvider for ClaudeProvider {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }

    fn config_path(&self) -> &Path {
        &self.path
    }

    fn projects(&self) -> Result<Vec<String>, McpSyncError> {
        let root = load_root(&self.path)?;
        self.project_keys(&root)
    }

    fn list_servers(&self) -> Result<BTreeMap<String, ConnectionSpec>, McpSyncError> {
        let root = load_root(&self.path)?;
        Ok(servers_map(&self.path, &root)?
            .map(|map| parse_servers(map, JsonDialect::Typed))
            .unwrap_or_default())
    }

    fn observed_state(&self, name: &str) -> Result<Option<EnabledState>, McpSyncError> {
        let root = load_root(&self.path)?;
        let installed = servers_map(&self.path, &root)?
            .map(|map| map.contains_key(name))
            .unwrap_or(false);
        if !installed {
            return Ok(None);
        }

        let projects = self.project_keys(&root)?;
        if projects.is_empty() {
            return Ok(Some(EnabledState::Global(true)));
        }
        Ok(Some(EnabledState::PerProject(
            projects
                .into_iter()
                .map(|project| {
                    let enabled = !self.disabled_in(&root, &project).contains(name);
                    (project, enabled)
                })
                .collect(),
        )))
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
            .and_then(|value| spec_from_json(value, JsonDialect::Typed));
        if let Some(settled) =
            settle_install(self.confirmer.as_ref(), self.display_name(), name, existing.as_ref(), spec)?
        {
            return Ok(settled);
        }

        servers.insert(
            name.to_string(),
            spec_to_json(spec, JsonDialect::Typed, current.as_ref()),
        );
        save_root(&self.path, &root)?;
        Ok(WriteResult::Applied)
    }

    fn enable_servers(
        &self,
        names: &[String],
        project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        self.set_disabled(names, project, false)
    }

    fn disable_servers(
        &self,
        names: &[String],
        project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError> {
        self.set_disabled(names, project, true)
    }

    fn sync_servers(&self, registry: &Registry) -> Result<WriteResult, McpSyncError> {
        let mut root = load_root(&self.path)?;
        let installed: HashSet<String> = servers_map(&self.path, &root)?
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        let known = self.project_keys(&root)?;
        if known.is_empty() {
            let to_remove = registry
                .servers
                .iter()
                .filter(|(name, record)| {
                    installed.contains(*name)
                        && record.enabled_for(self.id()).is_some()
                        && !self.is_server_enabled_in_meta(record)
                })
                .map(|(name, _)| name.clone())
                .collect::<Vec<_>>();
            return self.remover().remove(root, &to_remove);
        }

        let root_obj = object_mut(&self.path, &mut root, "root")?;
        let projects = child_object_mut(&self.path, root_obj, "projects")?;
        let mut changed = false;
        for (name, record) in &registry.servers {
            if !installed.contains(name) {
                continue;
            }
            let Some(state) = record.enabled_for(self.id()) else {
                continue;
            };
            for project in &known {
                let Some(enabled) = state.project_value(project) else {
                    continue;
                };
                let list = self.exclusion_list(projects, project)?;
                changed |= set_membership(list, name, !enabled);
            }
        }

        if changed {
            save_root(&self.path, &root)?;
        }
        Ok(WriteResult::from_changed(changed))
    }

    fn supports_disabled_state(&self) -> bool {
        self.projects()
            .map(|projects| !projects.is_empty())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::ClaudeProvider;
    use crate::models::{ConnectionSpec, EnabledState, Registry, ServerRecord, WriteResult};
    use crate::provider::{AutoConfirm, McpProvider};
    use serde_json::{json, Value as JsonValue};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn provider_with(temp: &tempfile::TempDir, content: JsonValue) -> ClaudeProvider {
        let provider = ClaudeProvider::new(temp.path(), Arc::new(AutoConfirm));
        std::fs::write(
            temp.path().join(".claude.json"),
            serde_json::to_string_pretty(&content).expect("render"),
        )
        .expect("write");
        provider
    }

    fn read(temp: &tempfile::TempDir) -> JsonValue {
        let raw = std::fs::read_to_string(temp.path().join(".claude.json")).expect("read");
        serde_json::from_str(&raw).expect("parse")
    }

    #[test]
    fn disable_for_one_project_touches_only_its_exclusions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(
            &temp,
            json!({
                "numStartups": 4,
                "mcpServers": { "fs": { "type": "stdio", "command": "npx" } },
                "projects": { "/a": {}, "/b": { "disabledMcpServers": [] } }
            }),
        );

        let result = provider
            .disable_servers(&[String::from("fs")], Some("/a"))
            .expect("disable");
        assert_eq!(result, WriteResult::Applied);

        let root = read(&temp);
        assert_eq!(root["projects"]["/a"]["disabledMcpServers"], json!(["fs"]));
        assert_eq!(root["projects"]["/b"]["disabledMcpServers"], json!([]));
        assert_eq!(root["numStartups"], json!(4));

        let again = provider
            .disable_servers(&[String::from("fs")], Some("/a"))
            .expect("disable again");
        assert_eq!(again, WriteResult::NoChanges);
    }

    #[test]
    fn observed_state_reports_per_project_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(
            &temp,
            json!({
                "mcpServers": { "fs": { "command": "npx" } },
                "projects": { "/a": { "disabledMcpServers": ["fs"] }, "/b": {} }
            }),
        );
        assert_eq!(
            provider.observed_state("fs").expect("state"),
            Some(EnabledState::PerProject(BTreeMap::from([
                (String::from("/a"), false),
                (String::from("/b"), true),
            ])))
        );
        assert_eq!(provider.observed_state("missing").expect("state"), None);
    }

    #[test]
    fn without_projects_disable_removes_the_server() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(
            &temp,
            json!({ "mcpServers": { "fs": { "command": "npx" }, "git": { "command": "git" } } }),
        );
        assert!(!provider.supports_disabled_state());

        let result = provider
            .disable_servers(&[String::from("fs")], None)
            .expect("disable");
        assert_eq!(result, WriteResult::Applied);
        assert_eq!(
            read(&temp)["mcpServers"],
            json!({ "git": { "command": "git" } })
        );
        assert_eq!(provider.observed_state("fs").expect("state"), None);
    }

    #[test]
    fn without_projects_sync_removes_servers_meant_to_be_off() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(
            &temp,
            json!({ "mcpServers": { "off": { "command": "a" }, "on": { "command": "b" }, "mine": { "command": "c" } } }),
        );

        let mut registry = Registry::default();
        for (name, state) in [("off", Some(false)), ("on", Some(true)), ("mine", None)] {
            let mut record = ServerRecord::new(ConnectionSpec::stdio("x", &[]));
            if let Some(value) = state {
                record
                    .meta
                    .enabled
                    .insert(String::from("claude"), EnabledState::Global(value));
            }
            registry.servers.insert(name.to_string(), record);
        }

        assert_eq!(
            provider.sync_servers(&registry).expect("sync"),
            WriteResult::Applied
        );
        let servers = read(&temp)["mcpServers"].clone();
        assert!(servers.get("off").is_none());
        assert!(servers.get("on").is_some());
        assert!(servers.get("mine").is_some());
    }

    #[test]
    fn unknown_project_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(&temp, json!({ "projects": { "/a": {} } }));
        assert!(provider
            .enable_servers(&[String::from("fs")], Some("/nope"))
            .is_err());
    }

    #[test]
    fn sync_applies_only_servers_with_meta_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = provider_with(
            &temp,
            json!({
                "mcpServers": { "fs": { "command": "npx" }, "mine": { "command": "mine" } },
                "projects": { "/a": { "disabledMcpServers": ["mine"] }, "/b": {} }
            }),
        );

        let mut registry = Registry::default();
        let mut fs_record = ServerRecord::new(ConnectionSpec::stdio("npx", &[]));
        fs_record.meta.enabled.insert(
            String::from("claude"),
            EnabledState::PerProject(BTreeMap::from([(String::from("/b"), false)])),
        );
        registry.servers.insert(String::from("fs"), fs_record);
        registry.servers.insert(
            String::from("mine"),
            ServerRecord::new(ConnectionSpec::stdio("mine", &[])),
        );

        assert_eq!(
            provider.sync_servers(&registry).expect("sync"),
            WriteResult::Applied
        );
        let root = read(&temp);
        assert_eq!(root["projects"]["/a"]["disabledMcpServers"], json!(["mine"]));
        assert_eq!(root["projects"]["/b"]["disabledMcpServers"], json!(["fs"]));
    }
}
