//! Assistant trait — the abstraction over the conversational collaborator.
//!
//! An Assistant reads the running transcript plus the newest user message and
//! answers with a reply, optionally carrying an extraction payload for the form.
//!
//! Implementations: HTTP chat backend, OpenAI-compatible LLM with extraction tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::extraction::ExtractionPayload;
use crate::message::{ChatMessage, Sender};

/// One transcript line as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub text: String,
}

impl From<&ChatMessage> for TranscriptEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            sender: message.sender,
            text: message.text.clone(),
        }
    }
}

/// A request to the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    /// The message that triggered this turn
    pub latest_message: String,

    /// Full transcript, including `latest_message` as its last entry
    pub transcript: Vec<TranscriptEntry>,
}

impl AssistantRequest {
    pub fn new<'a>(
        latest_message: impl Into<String>,
        transcript: impl IntoIterator<Item = &'a ChatMessage>,
    ) -> Self {
        Self {
            latest_message: latest_message.into(),
            transcript: transcript.into_iter().map(TranscriptEntry::from).collect(),
        }
    }
}

/// A successful assistant answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantResponse {
    /// Text shown in the chat pane
    pub reply: String,

    /// Form changes derived from the conversation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionPayload>,
}

impl AssistantResponse {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            extraction: None,
        }
    }

    pub fn with_extraction(reply: impl Into<String>, extraction: ExtractionPayload) -> Self {
        Self {
            reply: reply.into(),
            extraction: Some(extraction),
        }
    }
}

/// The core Assistant trait.
///
/// The conversation controller calls `respond()` without knowing which
/// backend answers. Any failure (transport, status, parse) is a single
/// [`CollaboratorError`]; there are no partial responses.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// A human-readable name for this collaborator (e.g., "http", "groq").
    fn name(&self) -> &str;

    /// Answer one turn.
    async fn respond(
        &self,
        request: AssistantRequest,
    ) -> std::result::Result<AssistantResponse, CollaboratorError>;

    /// Health check — can we reach the collaborator?
    async fn health_check(&self) -> std::result::Result<bool, CollaboratorError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Transcript;

    #[test]
    fn request_copies_transcript_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::Assistant, "Hello");
        transcript.push(Sender::User, "Met Dr. Smith today");

        let req = AssistantRequest::new("Met Dr. Smith today", transcript.iter());
        assert_eq!(req.transcript.len(), 2);
        assert_eq!(req.transcript[1].sender, Sender::User);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["latestMessage"], "Met Dr. Smith today");
        assert_eq!(json["transcript"][0]["sender"], "assistant");
    }

    #[test]
    fn response_without_extraction_omits_field() {
        let json = serde_json::to_value(AssistantResponse::text("Sure")).unwrap();
        assert!(json.get("extraction").is_none());
    }
}
