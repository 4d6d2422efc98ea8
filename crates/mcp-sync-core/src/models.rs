use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTransport {
    Http,
    Sse,
}

impl RemoteTransport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Sse => "sse",
        }
    }
}

/// How a host application reaches one MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSpec {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Remote {
        transport: RemoteTransport,
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl ConnectionSpec {
    pub fn stdio(command: impl Into<String>, args: &[&str]) -> Self {
        Self::Stdio {
            command: command.into(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self::Remote {
            transport: RemoteTransport::Http,
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn transport_label(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Remote { transport, .. } => transport.as_str(),
        }
    }
}

/// Desired on/off value of one server inside one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnabledState {
    Global(bool),
    PerProject(BTreeMap<String, bool>),
}

impl EnabledState {
    pub fn is_enabled_anywhere(&self) -> bool {
        match self {
            Self::Global(value) => *value,
            Self::PerProject(projects) => projects.values().any(|value| *value),
        }
    }

    pub fn project_value(&self, project: &str) -> Option<bool> {
        match self {
            Self::Global(value) => Some(*value),
            Self::PerProject(projects) => projects.get(project).copied(),
        }
    }

    /// State after toggling `targets` (every known project when `None`).
    ///
    /// A provider without projects always collapses to `Global`. A prior
    /// `Global` value is broadcast over `known_projects` before the targeted
    /// projects are overwritten, so no information is lost in the migration.
    pub fn toggled(
        prior: Option<&Self>,
        known_projects: &[String],
        targets: Option<&[String]>,
        enabled: bool,
    ) -> Self {
        if known_projects.is_empty() {
            return Self::Global(enabled);
        }

        let mut projects = match prior {
            Some(Self::PerProject(projects)) => projects.clone(),
            Some(Self::Global(value)) => known_projects
                .iter()
                .map(|project| (project.clone(), *value))
                .collect(),
            None => BTreeMap::new(),
        };
        for project in targets.unwrap_or(known_projects) {
            projects.insert(project.clone(), enabled);
        }
        Self::PerProject(projects)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMeta {
    #[serde(default)]
    pub enabled: BTreeMap<String, EnabledState>,
}

impl ServerMeta {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// One canonical server definition plus its cross-provider bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredServer", into = "StoredServer")]
pub struct ServerRecord {
    pub spec: ConnectionSpec,
    pub meta: ServerMeta,
}

impl ServerRecord {
    pub fn new(spec: ConnectionSpec) -> Self {
        Self {
            spec,
            meta: ServerMeta::default(),
        }
    }

    /// Copy without `_meta`, the only shape provider adapters ever receive.
    pub fn strip_meta(&self) -> Self {
        Self::new(self.spec.clone())
    }

    pub fn enabled_for(&self, provider: &str) -> Option<&EnabledState> {
        self.meta.enabled.get(provider)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredServer {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "ServerMeta::is_empty")]
    meta: ServerMeta,
}

impl TryFrom<StoredServer> for ServerRecord {
    type Error = String;

    fn try_from(stored: StoredServer) -> Result<Self, Self::Error> {
        let remote = match stored.transport.as_deref().map(str::trim) {
            Some("stdio") => None,
            Some("http") | Some("streamable-http") | Some("streamableHttp") => {
                Some(RemoteTransport::Http)
            }
            Some("sse") => Some(RemoteTransport::Sse),
            Some(other) => return Err(format!("unsupported transport type: {other}")),
            None if stored.url.is_some() && stored.command.is_none() => {
                Some(RemoteTransport::Http)
            }
            None => None,
        };

        let spec = match (remote, stored.command, stored.url) {
            (Some(transport), _, Some(url)) => ConnectionSpec::Remote {
                transport,
                url,
                headers: stored.headers,
            },
            (None, Some(command), _) => ConnectionSpec::Stdio {
                command,
                args: stored.args,
                env: stored.env,
            },
            (Some(transport), _, None) => {
                return Err(format!("{} server is missing url", transport.as_str()))
            }
            (None, None, _) => return Err("server has neither command nor url".to_string()),
        };

        Ok(Self {
            spec,
            meta: stored.meta,
        })
    }
}

impl From<ServerRecord> for StoredServer {
    fn from(record: ServerRecord) -> Self {
        let mut stored = StoredServer {
            meta: record.meta,
            ..Self::default()
        };
        match record.spec {
            ConnectionSpec::Stdio { command, args, env } => {
                stored.command = Some(command);
                stored.args = args;
                stored.env = env;
            }
            ConnectionSpec::Remote {
                transport,
                url,
                headers,
            } => {
                stored.transport = Some(transport.as_str().to_string());
                stored.url = Some(url);
                stored.headers = headers;
            }
        }
        stored
    }
}

/// The full contents of the Unified Store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerRecord>,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }
}

/// Outcome of one provider-facing mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    Applied,
    Rejected,
    NoChanges,
}

impl WriteResult {
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            Self::Applied
        } else {
            Self::NoChanges
        }
    }

    /// Rejected dominates, then Applied, then NoChanges.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Rejected, _) | (_, Self::Rejected) => Self::Rejected,
            (Self::Applied, _) | (_, Self::Applied) => Self::Applied,
            _ => Self::NoChanges,
        }
    }

    pub fn is_success(self) -> bool {
        self != Self::Rejected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::NoChanges => "no_changes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderOutcome {
    Written(WriteResult),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub provider: String,
    pub outcome: ProviderOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleReport {
    pub enabled: bool,
    pub providers: Vec<ProviderReport>,
    pub imported: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub providers: Vec<ProviderReport>,
    pub installed: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub provider: String,
    pub imported: Vec<String>,
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderServerStatus {
    pub provider: String,
    pub installed: bool,
    pub desired: Option<EnabledState>,
    pub drifted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub name: String,
    pub transport: String,
    pub providers: Vec<ProviderServerStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One line of `mcp-sync doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub display_name: String,
    pub config_path: String,
    pub config_exists: bool,
    pub supports_disabled_state: bool,
    pub projects: usize,
    pub servers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventStatus {
    Success,
    Partial,
    Failed,
}

impl AuditEventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for AuditEventStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(format!(
                "unsupported audit status: {other} (success|partial|failed)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    #[serde(rename = "occurred_at")]
    pub occurred_at: String,
    pub action: String,
    pub status: AuditEventStatus,
    pub summary: String,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{ConnectionSpec, EnabledState, Registry, RemoteTransport, WriteResult};
    use std::collections::BTreeMap;

    fn projects(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn enabled_state_parses_boolean_and_object_forms() {
        let raw = r#"{
  "mcpServers": {
    "weather": {
      "command": "node",
      "args": ["weather.js"],
      "_meta": { "enabled": { "gemini": true, "claude": { "/work/a": false } } }
    }
  }
}"#;
        let registry: Registry = serde_json::from_str(raw).expect("parse registry");
        let record = registry.get("weather").expect("weather");
        assert_eq!(record.enabled_for("gemini"), Some(&EnabledState::Global(true)));
        assert_eq!(
            record.enabled_for("claude"),
            Some(&EnabledState::PerProject(BTreeMap::from([(
                "/work/a".to_string(),
                false
            )])))
        );
        assert_eq!(record.spec, ConnectionSpec::stdio("node", &["weather.js"]));
    }

    #[test]
    fn record_without_command_or_url_is_rejected() {
        let raw = r#"{ "mcpServers": { "broken": { "args": ["x"] } } }"#;
        let error = serde_json::from_str::<Registry>(raw).expect_err("must fail");
        assert!(error.to_string().contains("neither command nor url"));
    }

    #[test]
    fn remote_record_infers_http_and_keeps_sse() {
        let raw = r#"{ "mcpServers": {
            "exa": { "url": "https://mcp.exa.ai/mcp" },
            "events": { "type": "sse", "url": "https://example.test/sse", "headers": { "X-Key": "${KEY}" } }
        } }"#;
        let registry: Registry = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            registry.get("exa").map(|record| &record.spec),
            Some(&ConnectionSpec::http("https://mcp.exa.ai/mcp"))
        );
        match &registry.get("events").expect("events").spec {
            ConnectionSpec::Remote {
                transport, headers, ..
            } => {
                assert_eq!(*transport, RemoteTransport::Sse);
                assert_eq!(headers.get("X-Key").map(String::as_str), Some("${KEY}"));
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_keys_survive_a_save() {
        let raw = r#"{ "mcpServers": {}, "owner": "me" }"#;
        let registry: Registry = serde_json::from_str(raw).expect("parse");
        let rendered = serde_json::to_string(&registry).expect("render");
        assert!(rendered.contains("\"owner\":\"me\""));
    }

    #[test]
    fn toggled_broadcasts_global_before_scoping() {
        let known = projects(&["/a", "/b"]);
        let next = EnabledState::toggled(
            Some(&EnabledState::Global(true)),
            &known,
            Some(&projects(&["/a"])),
            false,
        );
        assert_eq!(
            next,
            EnabledState::PerProject(BTreeMap::from([
                ("/a".to_string(), false),
                ("/b".to_string(), true),
            ]))
        );
    }

    #[test]
    fn toggled_without_projects_is_global() {
        let prior = EnabledState::PerProject(BTreeMap::from([("/a".to_string(), true)]));
        assert_eq!(
            EnabledState::toggled(Some(&prior), &[], None, false),
            EnabledState::Global(false)
        );
    }

    #[test]
    fn toggled_from_unknown_only_sets_targets() {
        let known = projects(&["/a", "/b"]);
        let next = EnabledState::toggled(None, &known, Some(&projects(&["/b"])), true);
        assert_eq!(
            next,
            EnabledState::PerProject(BTreeMap::from([("/b".to_string(), true)]))
        );
        assert!(next.is_enabled_anywhere());
        assert_eq!(next.project_value("/a"), None);
    }

    #[test]
    fn write_result_merge_prefers_rejected_then_applied() {
        assert_eq!(
            WriteResult::NoChanges.merge(WriteResult::Applied),
            WriteResult::Applied
        );
        assert_eq!(
            WriteResult::Applied.merge(WriteResult::Rejected),
            WriteResult::Rejected
        );
        assert_eq!(
            WriteResult::NoChanges.merge(WriteResult::NoChanges),
            WriteResult::NoChanges
        );
    }
}
