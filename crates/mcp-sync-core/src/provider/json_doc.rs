use super::Confirmer;
use crate::error::McpSyncError;
use crate::files::{atomic_write, read_optional};
use crate::models::{ConnectionSpec, RemoteTransport, WriteResult};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

/// Keys that describe how to reach a server. Everything else on a server
/// entry (timeouts, trust flags, ...) belongs to the host and is preserved.
const TRANSPORT_KEYS: [&str; 7] = ["type", "command", "args", "env", "url", "httpUrl", "headers"];

/// How a host spells remote transports in its JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonDialect {
    /// `type` on every entry (`stdio`, `http`, `sse`).
    Typed,
    /// `type` only to tell SSE apart; bare `url` means streamable HTTP.
    Untyped,
    /// `httpUrl` for streamable HTTP, `url` for SSE, no `type`.
    Gemini,
}

/// Missing or blank files read as an empty object.
pub(crate) fn load_root(path: &Path) -> Result<JsonValue, McpSyncError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(JsonValue::Object(JsonMap::new()));
    };
    if raw.trim().is_empty() {
        return Ok(JsonValue::Object(JsonMap::new()));
    }
    let parsed = serde_json::from_str::<JsonValue>(&raw)
        .map_err(|error| McpSyncError::malformed(path, error.to_string()))?;
    if !parsed.is_object() {
        return Err(McpSyncError::malformed(path, "root must be object"));
    }
    Ok(parsed)
}

pub(crate) fn save_root(path: &Path, root: &JsonValue) -> Result<(), McpSyncError> {
    let mut rendered = serde_json::to_vec_pretty(root)?;
    rendered.push(b'\n');
    atomic_write(path, &rendered)
}

pub(crate) fn object_mut<'a>(
    path: &Path,
    value: &'a mut JsonValue,
    label: &str,
) -> Result<&'a mut JsonMap<String, JsonValue>, McpSyncError> {
    value
        .as_object_mut()
        .ok_or_else(|| McpSyncError::malformed(path, format!("{label} must be object")))
}

/// `parent[key]` as an object, created when absent.
pub(crate) fn child_object_mut<'a>(
    path: &Path,
    parent: &'a mut JsonMap<String, JsonValue>,
    key: &str,
) -> Result<&'a mut JsonMap<String, JsonValue>, McpSyncError> {
    let value = parent
        .entry(key.to_string())
        .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    object_mut(path, value, key)
}

pub(crate) fn servers_map<'a>(
    path: &Path,
    root: &'a JsonValue,
) -> Result<Option<&'a JsonMap<String, JsonValue>>, McpSyncError> {
    match root.get("mcpServers") {
        None => Ok(None),
        Some(value) => value
            .as_object()
            .map(Some)
            .ok_or_else(|| McpSyncError::malformed(path, "mcpServers must be object")),
    }
}

pub(crate) fn parse_servers(
    map: &JsonMap<String, JsonValue>,
    dialect: JsonDialect,
) -> BTreeMap<String, ConnectionSpec> {
    let mut result = BTreeMap::new();
    for (name, value) in map {
        match spec_from_json(value, dialect) {
            Some(spec) => {
                result.insert(name.clone(), spec);
            }
            None => tracing::warn!(server = %name, "skipping entry with neither command nor url"),
        }
    }
    result
}

pub(crate) fn spec_from_json(value: &JsonValue, dialect: JsonDialect) -> Option<ConnectionSpec> {
    let obj = value.as_object()?;
    let declared = obj.get("type").and_then(JsonValue::as_str);

    let remote = match dialect {
        JsonDialect::Gemini => {
            if let Some(url) = string_field(obj, "httpUrl") {
                Some((RemoteTransport::Http, url))
            } else {
                string_field(obj, "url").map(|url| (RemoteTransport::Sse, url))
            }
        }
        JsonDialect::Typed | JsonDialect::Untyped => {
            string_field(obj, "url").map(|url| match declared {
                Some("sse") => (RemoteTransport::Sse, url),
                _ => (RemoteTransport::Http, url),
            })
        }
    };

    if declared != Some("stdio") {
        if let Some((transport, url)) = remote {
            return Some(ConnectionSpec::Remote {
                transport,
                url,
                headers: string_map(obj.get("headers")),
            });
        }
    }

    let command = string_field(obj, "command")?;
    let args = obj
        .get("args")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Some(ConnectionSpec::Stdio {
        command,
        args,
        env: string_map(obj.get("env")),
    })
}

/// Entry for `spec`, keeping host-owned keys from `existing`.
pub(crate) fn spec_to_json(
    spec: &ConnectionSpec,
    dialect: JsonDialect,
    existing: Option<&JsonValue>,
) -> JsonValue {
    let mut object = existing
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_default();
    for key in TRANSPORT_KEYS {
        object.remove(key);
    }

    match spec {
        ConnectionSpec::Stdio { command, args, env } => {
            if dialect == JsonDialect::Typed {
                object.insert("type".to_string(), JsonValue::String("stdio".to_string()));
            }
            object.insert("command".to_string(), JsonValue::String(command.clone()));
            if !args.is_empty() {
                object.insert(
                    "args".to_string(),
                    JsonValue::Array(args.iter().cloned().map(JsonValue::String).collect()),
                );
            }
            if !env.is_empty() {
                object.insert("env".to_string(), string_map_to_json(env));
            }
        }
        ConnectionSpec::Remote {
            transport,
            url,
            headers,
        } => {
            match (dialect, transport) {
                (JsonDialect::Gemini, RemoteTransport::Http) => {
                    object.insert("httpUrl".to_string(), JsonValue::String(url.clone()));
                }
                (JsonDialect::Gemini, RemoteTransport::Sse) => {
                    object.insert("url".to_string(), JsonValue::String(url.clone()));
                }
                (JsonDialect::Typed, _) | (JsonDialect::Untyped, RemoteTransport::Sse) => {
                    object.insert(
                        "type".to_string(),
                        JsonValue::String(transport.as_str().to_string()),
                    );
                    object.insert("url".to_string(), JsonValue::String(url.clone()));
                }
                (JsonDialect::Untyped, RemoteTransport::Http) => {
                    object.insert("url".to_string(), JsonValue::String(url.clone()));
                }
            }
            if !headers.is_empty() {
                object.insert("headers".to_string(), string_map_to_json(headers));
            }
        }
    }

    JsonValue::Object(object)
}

/// Host that can only express "off" by dropping the definition.
pub(crate) struct Remover<'a> {
    pub path: &'a Path,
    pub provider: &'a str,
    pub display_name: &'a str,
    pub confirmer: &'a dyn Confirmer,
}

impl Remover<'_> {
    /// Drops `names` from root `mcpServers`. One confirmation covers the batch.
    pub(crate) fn remove(
        &self,
        mut root: JsonValue,
        names: &[String],
    ) -> Result<WriteResult, McpSyncError> {
        let present: Vec<&String> = {
            let servers = servers_map(self.path, &root)?;
            names
                .iter()
                .filter(|name| servers.map(|map| map.contains_key(*name)).unwrap_or(false))
                .collect()
        };
        if present.is_empty() {
            return Ok(WriteResult::NoChanges);
        }

        let listed = present
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "{} cannot mark MCP servers disabled here; remove {listed} from {}?",
            self.display_name,
            self.path.display()
        );
        if !self.confirmer.confirm(&prompt)? {
            tracing::warn!(provider = self.provider, servers = %listed, "removal declined");
            return Ok(WriteResult::Rejected);
        }

        let root_obj = object_mut(self.path, &mut root, "root")?;
        let servers = child_object_mut(self.path, root_obj, "mcpServers")?;
        for name in present {
            servers.remove(name.as_str());
        }
        save_root(self.path, &root)?;
        tracing::info!(provider = self.provider, servers = %listed, "removed servers");
        Ok(WriteResult::Applied)
    }
}

/// Adds or removes `name` in a JSON string array; returns whether it changed.
pub(crate) fn set_membership(list: &mut Vec<JsonValue>, name: &str, present: bool) -> bool {
    let contains = list.iter().any(|item| item.as_str() == Some(name));
    match (present, contains) {
        (true, false) => {
            list.push(JsonValue::String(name.to_string()));
            true
        }
        (false, true) => {
            list.retain(|item| item.as_str() != Some(name));
            true
        }
        _ => false,
    }
}

fn string_field(obj: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(JsonValue::as_str)
        .map(ToString::to_string)
}

fn string_map(value: Option<&JsonValue>) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    if let Some(obj) = value.and_then(JsonValue::as_object) {
        for (key, value) in obj {
            if let Some(value) = value.as_str() {
                result.insert(key.clone(), value.to_string());
            }
        }
    }
    result
}

fn string_map_to_json(map: &BTreeMap<String, String>) -> JsonValue {
    JsonValue::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
            .collect(),
    )
}
