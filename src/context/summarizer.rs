//! Summarizer contract and the summary message artifact
//!
//! Producing the summary is the host's job. This module only fixes the
//! shape of what goes in (dropped messages) and what comes back (a system
//! message carrying the summary text).

use super::models::{Message, MessageContent};
use async_trait::async_trait;

/// Prefix marking a system message as a conversation summary
pub const SUMMARY_PREFIX: &str = "[Previous conversation summary]\n";

/// Summarizer trait for different summarization strategies
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize dropped messages into replacement text
    async fn summarize(&self, messages: &[Message]) -> Result<String, SummarizerError>;
}

/// Simple concatenation-based summarizer (fallback)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatenationSummarizer;

#[async_trait]
impl Summarizer for ConcatenationSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String, SummarizerError> {
        Ok(messages
            .iter()
            .map(Message::canonical_text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Summarizer errors
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Summarization failed: {0}")]
    Failed(String),
}

/// Build the system message that replaces dropped history
pub fn summary_message(summary: &str) -> Message {
    Message::system(format!("{}{}", SUMMARY_PREFIX, summary))
}

pub fn is_summary_message(message: &Message) -> bool {
    match &message.content {
        MessageContent::Text(text) => message.is_system() && text.starts_with(SUMMARY_PREFIX),
        MessageContent::Structured(_) => false,
    }
}

/// Insert `summary` as the oldest retained non-system entry of `kept`.
///
/// Leading system messages stay ahead of it; with no non-system messages
/// left the summary goes last.
pub fn insert_summary(mut kept: Vec<Message>, summary: Message) -> Vec<Message> {
    let position = kept
        .iter()
        .position(|message| !message.is_system())
        .unwrap_or(kept.len());
    kept.insert(position, summary);
    kept
}
