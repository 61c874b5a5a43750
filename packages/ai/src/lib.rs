#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM provider abstraction for the citizen assistant.
//!
//! Supports Google Gemini, Anthropic Claude, `OpenAI`, and any
//! `OpenAI`-compatible local/self-hosted server (Ollama, vLLM, llama.cpp,
//! LM Studio) via the `AI_BASE_URL` environment variable. The assistant
//! makes one completion per question; there is no tool use.

pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider answered without any text.
    #[error("Empty response from {provider}")]
    EmptyResponse {
        /// Provider name.
        provider: &'static str,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
