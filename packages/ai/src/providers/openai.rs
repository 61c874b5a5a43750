//! `OpenAI` chat-completions provider implementation.
//!
//! Also talks to self-hosted servers exposing the same API (Ollama, vLLM,
//! llama.cpp, LM Studio) when a base URL is configured.

use serde::{Deserialize, Serialize};

use super::{
    LlmProvider, LlmResponse, MAX_OUTPUT_TOKENS, Message, Role, StopReason, provider_error,
};
use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points the provider at another `OpenAI`-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

fn request_messages<'a>(
    system_prompt: &'a str,
    messages: &'a [Message],
) -> Vec<OpenAiMessage<'a>> {
    let mut api_messages = Vec::with_capacity(messages.len() + 1);
    if !system_prompt.is_empty() {
        api_messages.push(OpenAiMessage {
            role: "system",
            content: system_prompt,
        });
    }
    api_messages.extend(messages.iter().map(|m| OpenAiMessage {
        role: match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &m.content,
    }));
    api_messages
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<LlmResponse, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: request_messages(system_prompt, messages),
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let mut req = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&request);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<LlmResponse, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    let text = choice
        .message
        .content
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AiError::EmptyResponse { provider: "openai" })?
        .to_string();

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("length") => StopReason::MaxTokens,
        Some("stop") | None => StopReason::EndTurn,
        Some(_) => StopReason::Other,
    };

    Ok(LlmResponse { text, stop_reason })
}
