//! Data models for conversation messages and pruning results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed structural overhead added to every message (role and formatting)
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Role discriminator of a conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl Role {
    /// Parse a message type tag. Accepts `human` and `ai` as aliases.
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "system" => Role::System,
            "human" | "user" => Role::User,
            "ai" | "assistant" => Role::Assistant,
            other => Role::Other(other.to_string()),
        }
    }

    /// Label used in the canonical `[role]` serialization
    pub fn label(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(tag) => tag,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Role::System)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message content: plain text or a structured payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(serde_json::Value),
}

impl MessageContent {
    /// Flatten to text. Structured payloads use compact JSON with sorted keys.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Structured(value) => serde_json::to_string(value).unwrap_or_default(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<serde_json::Value> for MessageContent {
    fn from(value: serde_json::Value) -> Self {
        MessageContent::Structured(value)
    }
}

/// An immutable conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role.is_system()
    }

    /// Content flattened to text
    pub fn text(&self) -> String {
        self.content.as_text()
    }

    /// Canonical `"[role]\n<content>"` form sent to precise counters
    pub fn canonical_text(&self) -> String {
        format!("[{}]\n{}", self.role.label(), self.text())
    }
}

/// Outcome of pruning a conversation against a token budget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneResult {
    /// Retained messages in original order
    pub kept: Vec<Message>,
    /// Evicted messages, oldest first
    pub dropped: Vec<Message>,
    pub kept_tokens: usize,
    pub dropped_tokens: usize,
}

impl PruneResult {
    pub fn is_noop(&self) -> bool {
        self.dropped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_aliases() {
        assert_eq!(Role::from_type_tag("human"), Role::User);
        assert_eq!(Role::from_type_tag("ai"), Role::Assistant);
        assert_eq!(Role::from_type_tag("system"), Role::System);
        assert_eq!(Role::from_type_tag("tool").label(), "tool");
    }

    #[test]
    fn test_canonical_text() {
        let msg = Message::user("hello");
        assert_eq!(msg.canonical_text(), "[user]\nhello");

        let tool = Message::new(Role::Other("tool".to_string()), "ok");
        assert_eq!(tool.canonical_text(), "[tool]\nok");
    }

    #[test]
    fn test_structured_content_is_deterministic() {
        let a = Message::assistant(json!({"b": 1, "a": [true, null]}));
        let b = Message::assistant(json!({"a": [true, null], "b": 1}));
        assert_eq!(a.text(), r#"{"a":[true,null],"b":1}"#);
        assert_eq!(a.text(), b.text());
    }
}
