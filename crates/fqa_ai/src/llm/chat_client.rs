use fqa_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatPrompt, Llm};
use crate::client::{map_transport_error, RemoteEndpoint};

/// OpenAI-compatible `/chat/completions` client (Groq and friends).
#[derive(Debug, Clone)]
pub struct ChatCompletionsLlm {
    endpoint: RemoteEndpoint,
    model: String,
}

impl ChatCompletionsLlm {
    pub fn new(endpoint: RemoteEndpoint, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Llm for ChatCompletionsLlm {
    fn chat(&self, prompt: &ChatPrompt<'_>) -> Result<String, AppError> {
        let req = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system,
                },
                Message {
                    role: "user",
                    content: prompt.user,
                },
            ],
            temperature: prompt.temperature,
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_CHAT_FAILED", "Failed to encode chat request")
                .with_details(e.to_string())
        })?;

        debug!(model = %self.model, user_chars = prompt.user.len(), "chat request");
        let resp = ureq::post(&self.endpoint.url("chat/completions"))
            .timeout(self.endpoint.timeout())
            .set("Authorization", &self.endpoint.bearer())
            .send_json(body)
            .map_err(|e| map_transport_error("AI_CHAT_FAILED", "chat", e))?;

        let v: CompletionResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_CHAT_FAILED", "Failed to decode chat response")
                .with_details(e.to_string())
        })?;
        let content = v
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(AppError::new("AI_CHAT_FAILED", "Chat response was empty"));
        }
        Ok(content.trim().to_string())
    }
}
