//! Host applications whose MCP server configuration is kept in sync.
//!
//! Each adapter owns its file format. The orchestrator only talks to the
//! [`McpProvider`] trait and never branches on provider identity.

mod claude;
mod codex;
mod cursor;
mod gemini;
mod json_doc;

pub use claude::ClaudeProvider;
pub use codex::CodexProvider;
pub use cursor::CursorProvider;
pub use gemini::GeminiProvider;

use crate::error::McpSyncError;
use crate::models::{ConnectionSpec, EnabledState, Registry, ServerRecord, WriteResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Answers destructive or ambiguous changes an adapter is about to make.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> Result<bool, McpSyncError>;
}

/// Says yes to everything; used for `--yes` and `auto_confirm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool, McpSyncError> {
        tracing::debug!(prompt, "auto-confirmed");
        Ok(true)
    }
}

pub trait McpProvider {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn config_path(&self) -> &Path;

    fn config_exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Config partitions known to the provider. Empty means a single global scope.
    fn projects(&self) -> Result<Vec<String>, McpSyncError> {
        Ok(Vec::new())
    }

    fn list_servers(&self) -> Result<BTreeMap<String, ConnectionSpec>, McpSyncError>;

    fn server_config(&self, name: &str) -> Result<Option<ConnectionSpec>, McpSyncError> {
        Ok(self.list_servers()?.remove(name))
    }

    /// Enabled state the provider currently holds for an installed server.
    fn observed_state(&self, name: &str) -> Result<Option<EnabledState>, McpSyncError>;

    /// Idempotent: an identical stored definition yields `NoChanges`.
    fn install_server(&self, name: &str, spec: &ConnectionSpec)
        -> Result<WriteResult, McpSyncError>;

    fn enable_servers(
        &self,
        names: &[String],
        project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError>;

    fn disable_servers(
        &self,
        names: &[String],
        project: Option<&str>,
    ) -> Result<WriteResult, McpSyncError>;

    /// Reconciles every installed server that has a `_meta` entry for this
    /// provider. Servers without an entry are left as the user has them.
    fn sync_servers(&self, registry: &Registry) -> Result<WriteResult, McpSyncError>;

    fn supports_disabled_state(&self) -> bool;

    fn is_server_enabled_in_meta(&self, record: &ServerRecord) -> bool {
        record
            .enabled_for(self.id())
            .map(EnabledState::is_enabled_anywhere)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Claude,
    Gemini,
    Codex,
    Cursor,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::Claude, Self::Gemini, Self::Codex, Self::Cursor];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
            Self::Cursor => "cursor",
        }
    }

    pub fn build(self, home: &Path, confirmer: Arc<dyn Confirmer>) -> Box<dyn McpProvider> {
        match self {
            Self::Claude => Box::new(ClaudeProvider::new(home, confirmer)),
            Self::Gemini => Box::new(GeminiProvider::new(home, confirmer)),
            Self::Codex => Box::new(CodexProvider::new(home, confirmer)),
            Self::Cursor => Box::new(CursorProvider::new(home, confirmer)),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = McpSyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "gemini" => Ok(Self::Gemini),
            "codex" => Ok(Self::Codex),
            "cursor" => Ok(Self::Cursor),
            other => Err(McpSyncError::UnknownProvider(other.to_string())),
        }
    }
}

/// Every supported adapter rooted at `home`.
pub fn all_providers(home: &Path, confirmer: Arc<dyn Confirmer>) -> Vec<Box<dyn McpProvider>> {
    ProviderKind::ALL
        .iter()
        .map(|kind| kind.build(home, Arc::clone(&confirmer)))
        .collect()
}

/// `Some(result)` when the install is settled without writing, `None` to proceed.
pub(crate) fn settle_install(
    confirmer: &dyn Confirmer,
    display_name: &str,
    name: &str,
    existing: Option<&ConnectionSpec>,
    desired: &ConnectionSpec,
) -> Result<Option<WriteResult>, McpSyncError> {
    let Some(existing) = existing else {
        return Ok(None);
    };
    if existing == desired {
        return Ok(Some(WriteResult::NoChanges));
    }
    let prompt = format!(
        "{display_name} already defines MCP server '{name}' differently. Overwrite it?"
    );
    if confirmer.confirm(&prompt)? {
        Ok(None)
    } else {
        tracing::warn!(provider = display_name, server = name, "overwrite declined");
        Ok(Some(WriteResult::Rejected))
    }
}

pub(crate) fn home_file(home: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(home.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use super::{settle_install, AutoConfirm, Confirmer, ProviderKind};
    use crate::error::McpSyncError;
    use crate::models::{ConnectionSpec, WriteResult};

    struct Decline;

    impl Confirmer for Decline {
        fn confirm(&self, _prompt: &str) -> Result<bool, McpSyncError> {
            Ok(false)
        }
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!(
            " Gemini ".parse::<ProviderKind>().expect("parse"),
            ProviderKind::Gemini
        );
        assert!(matches!(
            "vscode".parse::<ProviderKind>(),
            Err(McpSyncError::UnknownProvider(_))
        ));
    }

    #[test]
    fn settle_install_short_circuits_identical_definition() {
        let spec = ConnectionSpec::stdio("node", &["a.js"]);
        let settled = settle_install(&Decline, "Test", "a", Some(&spec), &spec).expect("settle");
        assert_eq!(settled, Some(WriteResult::NoChanges));
    }

    #[test]
    fn settle_install_asks_before_overwriting() {
        let existing = ConnectionSpec::stdio("node", &["old.js"]);
        let desired = ConnectionSpec::stdio("node", &["new.js"]);
        assert_eq!(
            settle_install(&Decline, "Test", "a", Some(&existing), &desired).expect("settle"),
            Some(WriteResult::Rejected)
        );
        assert_eq!(
            settle_install(&AutoConfirm, "Test", "a", Some(&existing), &desired).expect("settle"),
            None
        );
        assert_eq!(
            settle_install(&Decline, "Test", "a", None, &desired).expect("settle"),
            None
        );
    }
}
