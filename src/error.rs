//! Error types for context management

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by the configuration and orchestration layers.
///
/// Token estimation, budgeting, pruning and the flush gate never fail;
/// only loading settings and calling out to a summarizer can.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),
}

impl From<::config::ConfigError> for ContextError {
    fn from(err: ::config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}
