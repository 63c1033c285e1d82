//! Chat transcript domain types.
//!
//! These are the value objects shown in the chat pane:
//! User types a message → Controller appends it → Assistant answers → reply is appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The field rep
    User,
    /// The assistant collaborator (or the controller speaking on its behalf)
    Assistant,
}

/// A single entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub sender: Sender,

    /// The text content
    pub text: String,

    /// Zero-based position in the transcript
    pub position: usize,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

/// An append-only, insertion-ordered list of chat messages.
///
/// Entries can only be pushed; nothing removes or rewrites them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return it.
    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> &ChatMessage {
        let position = self.messages.len();
        self.messages.push(ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            position,
            timestamp: Utc::now(),
        });
        &self.messages[position]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_assigns_positions_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::Assistant, "Hi! Tell me about your visit.");
        transcript.push(Sender::User, "Met Dr. Smith");
        transcript.push(Sender::User, "Met Dr. Smith");

        let positions: Vec<_> = transcript.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        // Duplicates are kept as-is
        assert_eq!(transcript.messages()[1].text, transcript.messages()[2].text);
        assert_ne!(transcript.messages()[1].id, transcript.messages()[2].id);
    }

    #[test]
    fn sender_serializes_lowercase() {
        let json = serde_json::to_string(&Sender::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn conversation_ids_are_unique() {
        assert_ne!(ConversationId::new(), ConversationId::new());
    }
}
