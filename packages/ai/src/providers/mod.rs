//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini, Anthropic Claude and `OpenAI`-compatible chat
//! completions via a common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// Upper bound on generated tokens. Answers are one or two sentences.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The citizen.
    User,
    /// The model.
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Message {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Response from the LLM provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Generated text, trimmed.
    pub text: String,
    /// Why generation stopped.
    pub stop_reason: StopReason,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Model finished its response naturally.
    EndTurn,
    /// Maximum tokens reached.
    MaxTokens,
    /// The provider withheld or cut the answer (safety filters, etc.).
    Other,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs (e.g., `"gemini"`).
    fn name(&self) -> &'static str;

    /// Sends a single completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, the provider reports an
    /// error, or the answer carries no text.
    async fn chat(&self, system_prompt: &str, messages: &[Message])
    -> Result<LlmResponse, AiError>;
}

/// Which API a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Google Gemini `generateContent`.
    Gemini,
    /// Anthropic Messages API.
    Anthropic,
    /// `OpenAI` chat completions, hosted or self-hosted.
    OpenAi,
}

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// API flavour.
    pub kind: ProviderKind,
    /// Model identifier.
    pub model: String,
    /// API key. Optional only for self-hosted `OpenAI`-compatible servers.
    pub api_key: Option<String>,
    /// Base URL override for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Gemini
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` or `AI_BASE_URL` set -> `OpenAI`-compatible
///
/// `AI_MODEL` overrides the provider's default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let settings = resolve_settings(|name| {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })?;
    log::info!("AI provider: {:?} ({})", settings.kind, settings.model);
    Ok(build_provider(settings))
}

/// Instantiates the provider described by `settings`.
#[must_use]
pub fn build_provider(settings: ProviderSettings) -> Box<dyn LlmProvider> {
    let api_key = settings.api_key.unwrap_or_default();
    match settings.kind {
        ProviderKind::Gemini => Box::new(gemini::GeminiProvider::new(api_key, settings.model)),
        ProviderKind::Anthropic => {
            Box::new(anthropic::AnthropicProvider::new(api_key, settings.model))
        }
        ProviderKind::OpenAi => {
            let provider = openai::OpenAiProvider::new(api_key, settings.model);
            Box::new(match settings.base_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            })
        }
    }
}

/// Resolves provider settings from an environment lookup.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the selected provider has no key or the
/// provider name is unknown.
pub fn resolve_settings(
    env: impl Fn(&str) -> Option<String>,
) -> Result<ProviderSettings, AiError> {
    let provider = env("AI_PROVIDER").unwrap_or_else(|| detect_provider(&env).to_string());
    let model = env("AI_MODEL");
    let base_url = env("AI_BASE_URL");

    let required_key = |name: &str| {
        env(name).ok_or_else(|| AiError::Config {
            message: format!("{name} environment variable not set"),
        })
    };

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => Ok(ProviderSettings {
            kind: ProviderKind::Gemini,
            api_key: Some(required_key("GEMINI_API_KEY")?),
            model: model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            base_url: None,
        }),
        "anthropic" | "claude" => Ok(ProviderSettings {
            kind: ProviderKind::Anthropic,
            api_key: Some(required_key("ANTHROPIC_API_KEY")?),
            model: model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
            base_url: None,
        }),
        "openai" | "gpt" | "local" => {
            // Self-hosted servers usually take no key.
            let api_key = if base_url.is_some() {
                env("OPENAI_API_KEY")
            } else {
                Some(required_key("OPENAI_API_KEY")?)
            };
            Ok(ProviderSettings {
                kind: ProviderKind::OpenAi,
                api_key,
                model: model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
                base_url,
            })
        }
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."
            ),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
fn detect_provider(env: &impl Fn(&str) -> Option<String>) -> &'static str {
    if env("GEMINI_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return "gemini";
    }
    if env("ANTHROPIC_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic";
    }
    if env("OPENAI_API_KEY").is_some() || env("AI_BASE_URL").is_some() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return "openai";
    }

    log::warn!(
        "No AI credentials detected. Set one of GEMINI_API_KEY, ANTHROPIC_API_KEY, \
         OPENAI_API_KEY or AI_BASE_URL. You can also set AI_PROVIDER explicitly."
    );

    // Produces a clear error about the missing key.
    "gemini"
}

/// Turns a provider's error body into [`AiError::Provider`].
///
/// All three APIs answer `{"error": {"message": ...}}` on failure; anything
/// else is reported with the raw status and body.
pub(crate) fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| format!("HTTP {status}: {body}"), |e| e.error.message);
    AiError::Provider { message }
}
