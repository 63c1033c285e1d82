//! Collaborator selection — builds the configured assistant.

use std::sync::Arc;
use std::time::Duration;

use hcplog_config::AssistantConfig;
use hcplog_core::assistant::Assistant;
use hcplog_core::error::CollaboratorError;

use crate::http_backend::HttpAssistant;
use crate::openai_compat::OpenAiCompatAssistant;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub(crate) const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Build the assistant named by `config.kind`.
pub fn build_from_config(
    config: &AssistantConfig,
) -> Result<Arc<dyn Assistant>, CollaboratorError> {
    match config.kind.as_str() {
        "http" => {
            let base_url = config.api_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL);
            let assistant = match config.timeout_secs {
                Some(secs) => HttpAssistant::with_timeout(base_url, Duration::from_secs(secs))?,
                None => HttpAssistant::new(base_url)?,
            };
            Ok(Arc::new(assistant))
        }
        "openai" => {
            let api_key = config.api_key.clone().unwrap_or_default();
            if api_key.is_empty() {
                return Err(CollaboratorError::NotConfigured(
                    "assistant.kind = \"openai\" needs an API key".into(),
                ));
            }
            let assistant = match &config.api_url {
                None => OpenAiCompatAssistant::groq(api_key, &config.model)?,
                Some(url) => {
                    OpenAiCompatAssistant::new(provider_name(url), url, api_key, &config.model)?
                }
            };
            let assistant = assistant.with_temperature(config.temperature);
            Ok(Arc::new(assistant))
        }
        other => Err(CollaboratorError::NotConfigured(format!(
            "unknown assistant kind: {other}"
        ))),
    }
}

fn provider_name(base_url: &str) -> &'static str {
    if base_url.contains("groq.com") {
        "groq"
    } else if base_url.contains("openai.com") {
        "openai"
    } else if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains("11434") {
        "ollama"
    } else {
        "openai-compatible"
    }
}
