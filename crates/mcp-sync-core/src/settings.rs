use crate::error::McpSyncError;
use crate::files::atomic_write;
use crate::paths::McpSyncPaths;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUDIT_LOG_LIMIT: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub version: u32,
    #[serde(default, rename = "disabled_providers")]
    pub disabled_providers: Vec<String>,
    #[serde(default, rename = "auto_confirm")]
    pub auto_confirm: bool,
    #[serde(default = "default_audit_log_limit", rename = "audit_log_limit")]
    pub audit_log_limit: usize,
}

fn default_audit_log_limit() -> usize {
    DEFAULT_AUDIT_LOG_LIMIT
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            version: 1,
            disabled_providers: Vec::new(),
            auto_confirm: false,
            audit_log_limit: DEFAULT_AUDIT_LOG_LIMIT,
        }
    }
}

impl SyncSettings {
    pub fn is_provider_disabled(&self, provider: &str) -> bool {
        self.disabled_providers
            .iter()
            .any(|item| item.trim().eq_ignore_ascii_case(provider))
    }
}

#[derive(Debug, Clone)]
pub struct SyncPreferencesStore {
    paths: McpSyncPaths,
}

impl Default for SyncPreferencesStore {
    fn default() -> Self {
        Self {
            paths: McpSyncPaths::detect(),
        }
    }
}

impl SyncPreferencesStore {
    pub fn new(paths: McpSyncPaths) -> Self {
        Self { paths }
    }

    pub fn load_settings(&self) -> SyncSettings {
        let Ok(data) = std::fs::read(&self.paths.settings_path) else {
            return SyncSettings::default();
        };

        match serde_json::from_slice(&data) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    path = %self.paths.settings_path.display(),
                    %error,
                    "ignoring unreadable settings file"
                );
                SyncSettings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &SyncSettings) -> Result<(), McpSyncError> {
        self.paths
            .ensure_runtime_dir()
            .map_err(|e| McpSyncError::io(&self.paths.runtime_directory, e))?;

        let normalized = SyncSettings {
            version: 1,
            disabled_providers: settings
                .disabled_providers
                .iter()
                .map(|item| item.trim().to_ascii_lowercase())
                .filter(|item| !item.is_empty())
                .collect(),
            auto_confirm: settings.auto_confirm,
            audit_log_limit: settings.audit_log_limit,
        };

        let mut payload = serde_json::to_vec_pretty(&normalized)?;
        payload.push(b'\n');
        atomic_write(&self.paths.settings_path, &payload)
    }

    pub fn paths(&self) -> &McpSyncPaths {
        &self.paths
    }
}
