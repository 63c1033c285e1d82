//! OpenAI-compatible collaborator.
//!
//! Works with Groq, OpenAI, OpenRouter, Ollama and any endpoint exposing
//! `/chat/completions` with function calling.
//!
//! The model is offered two form tools, and their calls become the extraction:
//! - `log_interaction` — any subset of record fields, tagged as a full fill
//! - `edit_interaction` — one `field_name` / `new_value` pair, tagged as a patch
//!
//! It may also call the CRM lookup tools. Every call is answered with a
//! `tool` message and the model is asked again, for a bounded number of rounds.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use hcplog_core::assistant::{Assistant, AssistantRequest, AssistantResponse};
use hcplog_core::error::CollaboratorError;
use hcplog_core::extraction::{ExtractionPayload, FillKind};
use hcplog_core::message::Sender;
use hcplog_core::record::{FieldName, InteractionType, Sentiment};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::crm_tools;

const LOG_TOOL: &str = "log_interaction";
const EDIT_TOOL: &str = "edit_interaction";

/// Completion requests per turn before giving up on further tool calls.
const MAX_TOOL_ROUNDS: usize = 4;

pub struct OpenAiCompatAssistant {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatAssistant {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CollaboratorError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            client,
        })
    }

    /// Create a Groq collaborator (convenience constructor).
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CollaboratorError> {
        Self::new("groq", crate::router::GROQ_BASE_URL, api_key, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn system_prompt() -> String {
        let today = Local::now().date_naive();
        format!(
            "You are an AI Assistant for a Life Sciences CRM. Help field reps log their \
             interactions with healthcare professionals (HCPs), find HCP info and schedule \
             tasks. Be concise.\n\
             Today is {} ({}).\n\
             When the user describes a new interaction, call {LOG_TOOL} with every detail \
             you can extract. When the user corrects one detail of the current record, call \
             {EDIT_TOOL}. Use {} to check a name, {} for product facts and {} to book a \
             follow-up. Resolve relative dates like \"Friday\" to YYYY-MM-DD. Times are HH:MM. \
             interactionType is one of {}. sentiment is one of {}.",
            today.format("%Y-%m-%d"),
            today.format("%A"),
            crm_tools::SEARCH_HCP,
            crm_tools::TALKING_POINTS,
            crm_tools::SCHEDULE_FOLLOW_UP,
            InteractionType::ALL.map(|t| t.as_str()).join(", "),
            Sentiment::ALL.map(|s| s.as_str()).join(", "),
        )
    }

    fn to_api_messages(request: &AssistantRequest) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage::text("system", Self::system_prompt())];
        messages.extend(request.transcript.iter().map(|entry| {
            let role = match entry.sender {
                Sender::User => "user",
                Sender::Assistant => "assistant",
            };
            ApiMessage::text(role, entry.text.clone())
        }));
        messages
    }

    fn tool_definitions() -> Value {
        let properties: serde_json::Map<String, Value> = FieldName::ALL
            .iter()
            .map(|field| (field.as_str().to_string(), field_schema(*field)))
            .collect();

        let mut tools = vec![
            json!({
                "type": "function",
                "function": {
                    "name": LOG_TOOL,
                    "description": "Fill the interaction form from a description of a new HCP interaction.",
                    "parameters": { "type": "object", "properties": properties }
                }
            }),
            json!({
                "type": "function",
                "function": {
                    "name": EDIT_TOOL,
                    "description": "Change a single field of the interaction currently being logged.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "field_name": {
                                "type": "string",
                                "enum": FieldName::ALL.map(|f| f.as_str())
                            },
                            "new_value": { "type": "string" }
                        },
                        "required": ["field_name", "new_value"]
                    }
                }
            }),
        ];
        tools.extend(crm_tools::definitions());
        Value::Array(tools)
    }

    /// One completion request; returns the first choice's message.
    async fn complete(&self, messages: &[ApiMessage]) -> Result<ApiMessage, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "tools": Self::tool_definitions(),
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion endpoint returned error");
            return Err(CollaboratorError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| CollaboratorError::Parse("No choices in response".into()))
    }
}

fn field_schema(field: FieldName) -> Value {
    match field {
        FieldName::InteractionType => json!({
            "type": "string",
            "enum": InteractionType::ALL.map(|t| t.as_str())
        }),
        FieldName::Sentiment => json!({
            "type": "string",
            "enum": Sentiment::ALL.map(|s| s.as_str())
        }),
        FieldName::Date => json!({ "type": "string", "description": "YYYY-MM-DD" }),
        FieldName::Time => json!({ "type": "string", "description": "HH:MM" }),
        _ => json!({ "type": "string" }),
    }
}

/// Collects the form tool calls of a whole turn into one extraction payload.
///
/// Several `edit_interaction` calls combine into a multi-field patch. Any
/// `log_interaction` call makes the whole payload a full fill.
#[derive(Debug, Default)]
struct FormCalls {
    payload: ExtractionPayload,
    kind: Option<FillKind>,
}

impl FormCalls {
    /// Run one tool call and return the text sent back to the model.
    ///
    /// Unparseable arguments or a malformed form call fail the turn. Lookup
    /// tool errors go back to the model instead.
    fn run(&mut self, call: &ApiToolCall) -> Result<String, CollaboratorError> {
        let name = call.function.name.as_str();
        let args: Value = serde_json::from_str(&call.function.arguments)
            .map_err(|e| CollaboratorError::Parse(format!("{name} arguments: {e}")))?;

        match name {
            LOG_TOOL => {
                let Value::Object(fields) = args else {
                    return Err(CollaboratorError::Parse(format!(
                        "{LOG_TOOL} arguments must be an object"
                    )));
                };
                self.payload.fields.extend(fields);
                self.kind = Some(FillKind::Full);
                Ok("Recorded on the form.".into())
            }
            EDIT_TOOL => {
                let field = args["field_name"].as_str().ok_or_else(|| {
                    CollaboratorError::Parse(format!("{EDIT_TOOL} is missing field_name"))
                })?;
                let value = args.get("new_value").cloned().unwrap_or(Value::Null);
                self.payload.fields.insert(field.to_string(), value);
                self.kind = self.kind.or(Some(FillKind::Patch));
                Ok(format!("Updated {field} on the form."))
            }
            lookup if crm_tools::is_lookup(lookup) => Ok(crm_tools::execute(lookup, &args)
                .unwrap_or_else(|e| format!("Error: {e}"))),
            other => {
                warn!(tool = other, "Model called an unknown tool");
                Ok(format!("Error: unknown tool '{other}'"))
            }
        }
    }

    fn finish(self) -> Option<ExtractionPayload> {
        let payload = self.payload;
        self.kind.map(|kind| payload.tagged(kind))
    }
}

/// Reply text when the model only called a tool.
fn confirmation(extraction: Option<&ExtractionPayload>) -> String {
    match extraction {
        Some(p) if p.kind == Some(FillKind::Full) => {
            "I've filled in the form from your description. Please review it.".into()
        }
        Some(p) => {
            let names: Vec<&str> = p.fields.keys().map(String::as_str).collect();
            format!("Updated {}.", names.join(" and "))
        }
        None => String::new(),
    }
}

#[async_trait]
impl Assistant for OpenAiCompatAssistant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &self,
        request: AssistantRequest,
    ) -> Result<AssistantResponse, CollaboratorError> {
        let mut messages = Self::to_api_messages(&request);
        let mut form = FormCalls::default();

        for round in 1..=MAX_TOOL_ROUNDS {
            debug!(assistant = %self.name, model = %self.model, round, "Sending completion request");

            let message = self.complete(&messages).await?;
            let calls = message.tool_calls.clone().unwrap_or_default();

            if calls.is_empty() {
                let extraction = form.finish();
                let reply = match message.content {
                    Some(text) if !text.trim().is_empty() => text,
                    _ => confirmation(extraction.as_ref()),
                };
                return Ok(AssistantResponse { reply, extraction });
            }

            messages.push(ApiMessage {
                role: "assistant".into(),
                ..message
            });
            for call in &calls {
                let output = form.run(call)?;
                debug!(tool = %call.function.name, "Tool call answered");
                messages.push(ApiMessage::tool_result(&call.id, output));
            }
        }

        warn!(max_rounds = MAX_TOOL_ROUNDS, "Model kept calling tools, stopping");
        let extraction = form.finish();
        let reply = match extraction.as_ref() {
            Some(_) => confirmation(extraction.as_ref()),
            None => "Sorry, I couldn't finish that request. Please try again.".into(),
        };
        Ok(AssistantResponse { reply, extraction })
    }

    async fn health_check(&self) -> Result<bool, CollaboratorError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API wire types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, output: String) -> Self {
        Self {
            role: "tool".into(),
            content: Some(output),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,

    #[serde(rename = "type", default = "function_type")]
    kind: String,

    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}
