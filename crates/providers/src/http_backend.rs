//! HTTP chat-backend collaborator.
//!
//! Talks to a CRM backend exposing `POST /chat`:
//!
//! ```text
//! → {"message": "...", "history": [{"sender": "user", "text": "..."}]}
//! ← {"response": "...", "extraction": {"hcpName": "..."}}
//! ```
//!
//! `reply` is accepted in place of `response`; unknown fields such as
//! `tool_used` are ignored.

use std::time::Duration;

use async_trait::async_trait;
use hcplog_core::assistant::{Assistant, AssistantRequest, AssistantResponse, TranscriptEntry};
use hcplog_core::error::CollaboratorError;
use hcplog_core::extraction::ExtractionPayload;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub struct HttpAssistant {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssistant {
    /// Create a collaborator for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, CollaboratorError> {
        Self::build(base_url.into(), None)
    }

    /// Same as [`new`](Self::new) but with a transport-level timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Self::build(base_url.into(), Some(timeout))
    }

    fn build(base_url: String, timeout: Option<Duration>) -> Result<Self, CollaboratorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CollaboratorError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [TranscriptEntry],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(alias = "reply")]
    response: String,

    #[serde(default)]
    extraction: Option<ExtractionPayload>,
}

#[async_trait]
impl Assistant for HttpAssistant {
    fn name(&self) -> &str {
        "http"
    }

    async fn respond(
        &self,
        request: AssistantRequest,
    ) -> Result<AssistantResponse, CollaboratorError> {
        let url = format!("{}/chat", self.base_url);

        // The backend wants prior turns only; the latest message travels separately
        let history = match request.transcript.split_last() {
            Some((last, rest)) if last.text == request.latest_message => rest,
            _ => request.transcript.as_slice(),
        };

        debug!(url = %url, history = history.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                message: &request.latest_message,
                history,
            })
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Chat backend returned error");
            return Err(CollaboratorError::Api {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        Ok(AssistantResponse {
            reply: body.response,
            extraction: body.extraction,
        })
    }

    async fn health_check(&self) -> Result<bool, CollaboratorError> {
        let url = format!("{}/interactions", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcplog_core::message::{Sender, Transcript};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(text: &str) -> AssistantRequest {
        let mut transcript = Transcript::new();
        transcript.push(Sender::Assistant, "Hi!");
        transcript.push(Sender::User, text);
        AssistantRequest::new(text, transcript.iter())
    }

    async fn backend_replying(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn parses_reply_and_extraction() {
        let server = MockServer::start().await;
        // Only the greeting goes in history; the latest message travels alone
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({
                "message": "Met Dr. Smith about CardioFix",
                "history": [{"sender": "assistant", "text": "Hi!"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Logged it.",
                "tool_used": true,
                "extraction": {"hcpName": "Dr. Smith", "topics": "CardioFix"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = HttpAssistant::new(server.uri()).unwrap();
        let response = assistant
            .respond(request("Met Dr. Smith about CardioFix"))
            .await
            .unwrap();

        assert_eq!(response.reply, "Logged it.");
        let extraction = response.extraction.unwrap();
        assert_eq!(extraction.len(), 2);
        assert_eq!(extraction.fields["hcpName"], "Dr. Smith");
    }

    #[tokio::test]
    async fn accepts_reply_alias_without_extraction() {
        let server = backend_replying(
            ResponseTemplate::new(200).set_body_json(json!({"reply": "Hello there"})),
        )
        .await;

        let assistant = HttpAssistant::new(server.uri()).unwrap();
        let response = assistant.respond(request("hi")).await.unwrap();
        assert_eq!(response.reply, "Hello there");
        assert!(response.extraction.is_none());
    }

    #[tokio::test]
    async fn server_error_is_api_failure() {
        let server = backend_replying(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})),
        )
        .await;

        let assistant = HttpAssistant::new(server.uri()).unwrap();
        let err = assistant.respond(request("hi")).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Api { status_code: 500, ref message } if message.contains("boom")));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_failure() {
        let server = backend_replying(
            ResponseTemplate::new(200).set_body_json(json!({"unexpected": 1})),
        )
        .await;

        let assistant = HttpAssistant::new(server.uri()).unwrap();
        let err = assistant.respond(request("hi")).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_failure() {
        // Start then drop a server to get a port nobody listens on
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let assistant = HttpAssistant::new(uri).unwrap();
        let err = assistant.respond(request("hi")).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Network(_)));
    }

    #[tokio::test]
    async fn health_check_lists_interactions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/interactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = HttpAssistant::new(server.uri()).unwrap();
        assert!(assistant.health_check().await.unwrap());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let assistant = HttpAssistant::new("http://localhost:8000/").unwrap();
        assert_eq!(assistant.base_url(), "http://localhost:8000");
    }
}
