use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpSyncError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error in {path}: {reason}")]
    Toml { path: PathBuf, reason: String },

    #[error("Unified store not found at {0} (run `mcp-sync init` first)")]
    StoreMissing(PathBuf),
    #[error("Unified store at {path} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Malformed provider config {path}: {reason}")]
    MalformedProviderConfig { path: PathBuf, reason: String },

    #[error("Unknown provider: {0} (claude|gemini|codex|cursor)")]
    UnknownProvider(String),
    #[error("{provider} has no project {project}")]
    UnknownProject { provider: String, project: String },

    #[error("Every targeted provider failed ({0} attempted)")]
    AllProvidersFailed(usize),

    #[error("Cannot determine the home directory")]
    HomeNotFound,

    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),
}

impl McpSyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedProviderConfig {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn toml(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Toml {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that abort the whole command rather than a single provider.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StoreMissing(_) | Self::StoreCorrupt { .. } | Self::AllProvidersFailed(_)
        )
    }
}
