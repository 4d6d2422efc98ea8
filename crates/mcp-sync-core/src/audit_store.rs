use crate::error::McpSyncError;
use crate::files::atomic_write;
use crate::models::{AuditEvent, AuditEventStatus};
use crate::paths::McpSyncPaths;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SyncAuditStore {
    paths: McpSyncPaths,
    max_events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuditLogPayload {
    version: u32,
    #[serde(default)]
    events: Vec<AuditEvent>,
}

impl SyncAuditStore {
    pub fn new(paths: McpSyncPaths, max_events: usize) -> Self {
        Self { paths, max_events }
    }

    pub fn load_events(&self) -> Vec<AuditEvent> {
        let Ok(data) = std::fs::read(&self.paths.audit_log_path) else {
            return Vec::new();
        };

        serde_json::from_slice::<AuditLogPayload>(&data)
            .map(|payload| payload.events)
            .unwrap_or_default()
    }

    pub fn record(
        &self,
        action: &str,
        status: AuditEventStatus,
        summary: String,
        providers: Vec<String>,
        details: Option<String>,
    ) -> Result<AuditEvent, McpSyncError> {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            action: action.to_string(),
            status,
            summary,
            providers,
            details,
        };
        self.append_event(event.clone())?;
        Ok(event)
    }

    pub fn append_event(&self, event: AuditEvent) -> Result<(), McpSyncError> {
        let mut events = self.load_events();
        events.push(event);

        if self.max_events > 0 && events.len() > self.max_events {
            let drop_count = events.len() - self.max_events;
            events.drain(0..drop_count);
        }

        self.save_events(&events)
    }

    /// Newest first.
    pub fn list_events(
        &self,
        limit: Option<usize>,
        status_filter: Option<AuditEventStatus>,
        action_filter: Option<&str>,
    ) -> Vec<AuditEvent> {
        let normalized_action = action_filter
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_ascii_lowercase());
        let max = limit.unwrap_or(200).max(1);

        self.load_events()
            .into_iter()
            .rev()
            .filter(|event| {
                status_filter
                    .map(|status| event.status == status)
                    .unwrap_or(true)
            })
            .filter(|event| {
                normalized_action
                    .as_ref()
                    .map(|needle| event.action.to_ascii_lowercase().contains(needle))
                    .unwrap_or(true)
            })
            .take(max)
            .collect()
    }

    fn save_events(&self, events: &[AuditEvent]) -> Result<(), McpSyncError> {
        let payload = AuditLogPayload {
            version: 1,
            events: events.to_vec(),
        };
        let mut data = serde_json::to_vec_pretty(&payload)?;
        data.push(b'\n');
        atomic_write(&self.paths.audit_log_path, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::SyncAuditStore;
    use crate::models::{AuditEvent, AuditEventStatus};
    use crate::paths::McpSyncPaths;
    use tempfile::tempdir;

    fn event(id: usize, action: &str, status: AuditEventStatus) -> AuditEvent {
        AuditEvent {
            id: format!("event-{id}"),
            occurred_at: String::from("2026-02-21T12:00:00Z"),
            action: action.to_string(),
            status,
            summary: format!("summary-{id}"),
            providers: vec![String::from("claude")],
            details: None,
        }
    }

    #[test]
    fn append_event_keeps_ring_limit() {
        let dir = tempdir().expect("tempdir");
        let limit = 10usize;
        let store = SyncAuditStore::new(McpSyncPaths::from_runtime(dir.path().to_path_buf()), limit);

        for id in 0..(limit + 10) {
            store
                .append_event(event(id, "toggle", AuditEventStatus::Success))
                .expect("append");
        }

        let events = store.load_events();
        assert_eq!(events.len(), limit);
        assert_eq!(
            events.first().map(|item| item.id.as_str()),
            Some("event-10")
        );
        assert_eq!(events.last().map(|item| item.id.as_str()), Some("event-19"));
    }

    #[test]
    fn list_events_filters_by_status_and_action() {
        let dir = tempdir().expect("tempdir");
        let store = SyncAuditStore::new(McpSyncPaths::from_runtime(dir.path().to_path_buf()), 100);

        store
            .append_event(event(1, "sync", AuditEventStatus::Success))
            .expect("append");
        store
            .append_event(event(2, "sync", AuditEventStatus::Failed))
            .expect("append");
        store
            .append_event(event(3, "toggle", AuditEventStatus::Partial))
            .expect("append");

        let failed_sync = store.list_events(Some(10), Some(AuditEventStatus::Failed), Some("sync"));
        assert_eq!(failed_sync.len(), 1);
        assert_eq!(failed_sync[0].id, "event-2");
    }

    #[test]
    fn record_stamps_id_and_time() {
        let dir = tempdir().expect("tempdir");
        let store = SyncAuditStore::new(McpSyncPaths::from_runtime(dir.path().to_path_buf()), 100);
        let recorded = store
            .record(
                "import",
                AuditEventStatus::Success,
                String::from("imported 2"),
                vec![String::from("gemini")],
                None,
            )
            .expect("record");

        assert!(!recorded.id.is_empty());
        assert!(recorded.occurred_at.ends_with('Z'));
        assert_eq!(store.list_events(None, None, None), vec![recorded]);
    }
}
