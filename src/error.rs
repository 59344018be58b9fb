use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LkError {
    #[error("unable to resolve target: {0}")]
    Resolve(String),

    #[error("{0}")]
    Search(String),

    #[error("invalid search configuration: {0}")]
    Configuration(String),

    #[error("MAST request failed: {0}")]
    Transport(String),

    #[error("MAST returned status {status}: {message}")]
    TransportStatus { status: u16, message: String },

    #[error("missing config file lksearch.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl LkError {
    /// True for network and HTTP failures, as opposed to "nothing matched".
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LkError::Transport(_) | LkError::TransportStatus { .. }
        )
    }
}

/// Non-fatal condition raised while an operation still completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchWarning {
    pub message: String,
}

impl SearchWarning {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(%message, "search warning");
        Self { message }
    }
}

impl fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
