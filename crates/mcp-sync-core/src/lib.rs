pub mod audit_store;
pub mod engine;
pub mod error;
pub mod files;
pub mod models;
pub mod paths;
pub mod provider;
pub mod settings;
pub mod unified_store;

pub use audit_store::SyncAuditStore;
pub use engine::{
    secret_warnings, ProjectSelector, SyncEngine, SyncEnvironment, ToggleRequest,
};
pub use error::McpSyncError;
pub use models::{
    AuditEvent, AuditEventStatus, ConnectionSpec, EnabledState, ImportReport, ProviderHealth,
    ProviderOutcome, ProviderReport, ProviderServerStatus, Registry, RemoteTransport,
    ServerMeta, ServerRecord, ServerStatus, SyncReport, ToggleReport, WriteResult,
};
pub use paths::McpSyncPaths;
pub use provider::{
    all_providers, AutoConfirm, ClaudeProvider, CodexProvider, Confirmer, CursorProvider,
    GeminiProvider, McpProvider, ProviderKind,
};
pub use settings::{SyncPreferencesStore, SyncSettings, DEFAULT_AUDIT_LOG_LIMIT};
pub use unified_store::UnifiedStore;
