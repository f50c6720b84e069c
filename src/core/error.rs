use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a whole run. Per-page and per-entry problems are
/// recorded as diagnostics instead and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration for source '{source_id}': {message}")]
    Config { source_id: String, message: String },

    #[error("structural invariant violated: {0}")]
    Structural(String),

    #[error("failed to read pages from {path}: {message}")]
    Input { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn config(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }
}
