use super::{home_file, settle_install, Confirmer, McpProvider};
use crate::error::McpSyncError;
use crate::files::{atomic_write, read_optional};
use crate::models::{ConnectionSpec, EnabledState, Registry, RemoteTransport, WriteResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml_edit::{Array, DocumentMut, Item, Table, TableLike};

const SERVERS_KEY: &str = "mcp_servers";
const TRANSPORT_KEYS: [&str; 7] = [
    "type",
    "command",
    "args",
    "env",
    "url",
    "http_headers",
    "headers",
];

/// `~/.codex/config.toml`. Reads go through `toml`, edits through
/// `toml_edit` so comments and unrelated tables survive.
pub struct CodexProvider {
    path: PathBuf,
    confirmer: Arc<dyn Confirmer>,
}

impl CodexProvider {
    pub fn new(home: &Path, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            path: home_file(home, &[".codex", "config.toml"]),
            confirmer,
        }
    }

    fn read_raw(&self) -> Result<String, McpSyncError> {
        Ok(read_optional(&self.path)?.unwrap_or_default())
    }

    fn server_tables(&self, raw: &str) -> Result<toml::Table, McpSyncError> {
        if raw.trim().is_empty() {
            return Ok(toml::Table::new());
        }
        let mut root = toml::from_str::<toml::Table>(raw)
            .map_err(|error| McpSyncError::toml(&self.path, error))?;
        match root.remove(SERVERS_KEY) {
            None => Ok(toml::Table::new()),
            Some(toml::Value::Table(servers)) => Ok(servers),
            Some(_) => Err(McpSyncError::malformed(
                &self.path,
                "mcp_servers must be a table",
            )),
        }
    }

    fn parse_doc(&self, raw: &str) -> Result<DocumentMut, McpSyncError> {
        raw.parse::<DocumentMut>()
            .map_err(|error| McpSyncError::toml(&self.path, error))
    }

    /// Standard and inline tables alike.
    fn servers_mut<'a>(
        &self,
        doc: &'a mut DocumentMut,
    ) -> Result<&'a mut dyn TableLike, McpSyncError> {
        let item = doc.as_table_mut().entry(SERVERS_KEY).or_insert_with(|| {
            let mut table = Table::new();
            table.set_implicit(true);
            Item::Table(table)
        });
        item.as_table_like_mut()
            .ok_or_else(|| McpSyncError::malformed(&self.path, "mcp_servers must be a table"))
    }

    fn write_doc(&self, doc: &DocumentMut) -> Result<(), McpSyncError> {
        atomic_write(&self.path, doc.to_string().as_bytes())
    }

    fn set_enabled(&self, names: &[String], enabled: bool) -> Result<WriteResult, McpSyncError> {
        let raw = self.read_raw()?;
        let mut doc = self.parse_doc(&raw)?;
        if !doc.contains_key(SERVERS_KEY) {
            return Ok(WriteResult::NoChanges);
        }
        let servers = self.servers_mut(&mut doc)?;

        let mut changed = false;
        for name in names {
            let Some(entry) = servers.get_mut(name).and_then(Item::as_table_like_mut) else {
                tracing::warn!(provider = self.id(), server = %name, "server not installed");
                continue;
            };
            changed |= set_enabled_flag(entry, enabled);
        }

        if changed {
            self.write_doc(&doc)?;
        }
        Ok(WriteResult::from_changed(changed))
    }
}

impl McpProvider for CodexProvider {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn config_path(&self) -> &Path {
        &self.path
    }

    fn list_servers(&self) -> Result<BTreeMap<String, ConnectionSpec>, McpSyncError> {
        let raw = self.read_raw()?;
        let mut result = BTreeMap::new();
        for (name, value) in self.server_tables(&raw)? {
            match value.as_table().and_then(spec_from_table) {
                Some(spec) => {
                    result.insert(name, spec);
                }
                None => tracing::warn!(server = %name, "skipping entry with neither command nor url"),
            }
        }
        Ok(result)
    }

    fn observed_state(&self, name: &str) -> Result<Option<EnabledState>, McpSyncError> {
        let raw = self.read_raw()?;
        let servers = self.server_tables(&raw)?;
        Ok(servers.get(name).and_then(toml::Value::as_table).map(|table| {
            let enabled = table
                .get("enabled")
                .and_then(toml::Value::as_bool)
                .unwrap_or(true);
            EnabledState::Global(enabled)
        }))
    }

    fn install_server(
        &self,
        name: &str,
        spec: &ConnectionSpec,
    ) -> Result<WriteResult, McpSyncError> {
        let raw = self.read_raw()?;
        let existing = self
            .server_tables(&raw)?
            .get(name)
            .and_then(toml::Value::as_table)
            .and_then(spec_from_table);
        if let Some(settled) =
            settle_install(self.confirmer.as_ref(), self.display_name(), name, existing.as_ref(), spec)?
        {
            return Ok(settled);
        }

        let mut doc = self.parse_doc(&raw)?;
        let servers = self.servers_mut(&mut doc)?;
        let mut entry = servers
            .remove(name)
            .and_then(|item| item.into_table().ok())
            .unwrap_or_default();
        write_spec(&mut entry, spec);
        servers.insert(name, Item::Table(entry));
        self.write_doc(&doc)?;
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
        let raw = self.read_raw()?;
        let mut doc = self.parse_doc(&raw)?;
        if !doc.contains_key(SERVERS_KEY) {
            return Ok(WriteResult::NoChanges);
        }
        let servers = self.servers_mut(&mut doc)?;

        let mut changed = false;
        for (name, record) in &registry.servers {
            if record.enabled_for(self.id()).is_none() {
                continue;
            }
            let Some(entry) = servers.get_mut(name).and_then(Item::as_table_like_mut) else {
                continue;
            };
            changed |= set_enabled_flag(entry, self.is_server_enabled_in_meta(record));
        }

        if changed {
            self.write_doc(&doc)?;
        }
        Ok(WriteResult::from_changed(changed))
    }

    fn supports_disabled_state(&self) -> bool {
        true
    }
}

/// Enabled servers carry no flag; disabled ones carry `enabled = false`.
fn set_enabled_flag(entry: &mut dyn TableLike, enabled: bool) -> bool {
    let current = entry.get("enabled").and_then(Item::as_bool);
    match (enabled, current) {
        (true, Some(false)) => {
            entry.remove("enabled");
            true
        }
        (true, _) | (false, Some(false)) => false,
        (false, _) => {
            entry.insert("enabled", toml_edit::value(false));
            true
        }
    }
}

fn spec_from_table(table: &toml::Table) -> Option<ConnectionSpec> {
    let declared = table.get("type").and_then(toml::Value::as_str);
    if declared != Some("stdio") {
        if let Some(url) = table.get("url").and_then(toml::Value::as_str) {
            let transport = if declared == Some("sse") {
                RemoteTransport::Sse
            } else {
                RemoteTransport::Http
            };
            let headers = table
                .get("http_headers")
                .or_else(|| table.get("headers"))
                .map(string_table)
                .unwrap_or_default();
            return Some(ConnectionSpec::Remote {
                transport,
                url: url.to_string(),
                headers,
            });
        }
    }

    let command = table.get("command").and_then(toml::Value::as_str)?;
    let args = table
        .get("args")
        .and_then(toml::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Some(ConnectionSpec::Stdio {
        command: command.to_string(),
        args,
        env: table.get("env").map(string_table).unwrap_or_default(),
    })
}

fn string_table(value: &toml::Value) -> BTreeMap<String, String> {
    value
        .as_table()
        .map(|table| {
            table
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|value| (key.clone(), value.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Replaces transport keys in `entry`; `enabled`, timeouts and the rest stay.
fn write_spec(entry: &mut Table, spec: &ConnectionSpec) {
    for key in TRANSPORT_KEYS {
        entry.remove(key);
    }

    match spec {
        ConnectionSpec::Stdio { command, args, env } => {
            entry.insert("command", toml_edit::value(command.as_str()));
            if !args.is_empty() {
                let mut array = Array::new();
                for arg in args {
                    array.push(arg.as_str());
                }
                entry.insert("args", toml_edit::value(array));
            }
            if !env.is_empty() {
                entry.insert("env", Item::Table(string_map_table(env)));
            }
        }
        ConnectionSpec::Remote {
            transport,
            url,
            headers,
        } => {
            if *transport == RemoteTransport::Sse {
                entry.insert("type", toml_edit::value("sse"));
            }
            entry.insert("url", toml_edit::value(url.as_str()));
            if !headers.is_empty() {
                entry.insert("http_headers", Item::Table(string_map_table(headers)));
            }
        }
    }
}

fn string_map_table(map: &BTreeMap<String, String>) -> Table {
    let mut table = Table::new();
    for (key, value) in map {
        table.insert(key, toml_edit::value(value.as_str()));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::CodexProvider;
    use crate::models::{ConnectionSpec, EnabledState, WriteResult};
    use crate::provider::{AutoConfirm, McpProvider};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn config_path(temp: &tempfile::TempDir) -> std::path::PathBuf {
        temp.path().join(".codex").join("config.toml")
    }

    fn seed(temp: &tempfile::TempDir, body: &str) {
        let path = config_path(temp);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, body).expect("write");
    }

    fn read(temp: &tempfile::TempDir) -> String {
        std::fs::read_to_string(config_path(temp)).expect("read")
    }

    #[test]
    fn install_writes_mcp_servers_table_and_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed(&temp, "# keep me\nmodel = \"o3\"\n");
        let provider = CodexProvider::new(temp.path(), Arc::new(AutoConfirm));

        let mut env = BTreeMap::new();
        env.insert(String::from("API_KEY"), String::from("${API_KEY}"));
        let spec = ConnectionSpec::Stdio {
            command: String::from("npx"),
            args: vec![String::from("-y"), String::from("exa-mcp")],
            env,
        };

        assert_eq!(
            provider.install_server("exa", &spec).expect("install"),
            WriteResult::Applied
        );
        let body = read(&temp);
        assert!(body.contains("# keep me"));
        assert!(body.contains("[mcp_servers.exa]"));
        assert_eq!(
            provider.list_servers().expect("list").get("exa"),
            Some(&spec)
        );
        assert_eq!(
            provider.install_server("exa", &spec).expect("install again"),
            WriteResult::NoChanges
        );
    }

    #[test]
    fn disable_sets_enabled_false_and_enable_clears_it() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed(
            &temp,
            "[mcp_servers.docs]\nurl = \"https://docs.test/mcp\"\nstartup_timeout_sec = 20\n",
        );
        let provider = CodexProvider::new(temp.path(), Arc::new(AutoConfirm));
        let names = [String::from("docs")];

        assert_eq!(
            provider.disable_servers(&names, None).expect("disable"),
            WriteResult::Applied
        );
        assert!(read(&temp).contains("enabled = false"));
        assert_eq!(
            provider.observed_state("docs").expect("state"),
            Some(EnabledState::Global(false))
        );
        assert_eq!(
            provider.disable_servers(&names, None).expect("disable again"),
            WriteResult::NoChanges
        );

        assert_eq!(
            provider.enable_servers(&names, None).expect("enable"),
            WriteResult::Applied
        );
        let body = read(&temp);
        assert!(!body.contains("enabled"));
        assert!(body.contains("startup_timeout_sec = 20"));
    }

    #[test]
    fn inline_server_tables_can_be_toggled() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed(&temp, "[mcp_servers]\nfs = { command = \"npx\" }\n");
        let provider = CodexProvider::new(temp.path(), Arc::new(AutoConfirm));
        let names = [String::from("fs")];
        assert!(provider.list_servers().expect("list").contains_key("fs"));

        assert_eq!(
            provider.disable_servers(&names, None).expect("disable"),
            WriteResult::Applied
        );
        assert!(read(&temp).contains("enabled = false"));
        assert_eq!(
            provider.observed_state("fs").expect("state"),
            Some(EnabledState::Global(false))
        );

        assert_eq!(
            provider.enable_servers(&names, None).expect("enable"),
            WriteResult::Applied
        );
        assert_eq!(
            provider.observed_state("fs").expect("state"),
            Some(EnabledState::Global(true))
        );
        assert_eq!(
            provider.server_config("fs").expect("read"),
            Some(ConnectionSpec::stdio("npx", &[]))
        );
    }

    #[test]
    fn sse_servers_are_typed() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed(
            &temp,
            "[mcp_servers.events]\ntype = \"sse\"\nurl = \"https://events.test/sse\"\n",
        );
        let provider = CodexProvider::new(temp.path(), Arc::new(AutoConfirm));
        let spec = provider
            .server_config("events")
            .expect("read")
            .expect("present");
        assert_eq!(spec.transport_label(), "sse");
    }

    #[test]
    fn malformed_toml_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed(&temp, "[mcp_servers\n");
        let provider = CodexProvider::new(temp.path(), Arc::new(AutoConfirm));
        assert!(provider.list_servers().is_err());
    }
}
