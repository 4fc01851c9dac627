//! Provider client abstractions for ideaboard-runtime.
//!
//! Every backend is reduced to one capability: one prompt in, one text
//! blob out, or a [`ProviderError`]. Backends are added by registering a
//! [`ProviderFactory`], never by branching on backend identity.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] and [`CredentialStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;
mod stub;

#[cfg(any(feature = "openai", feature = "gemini"))]
mod http;

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderContext, ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource, CredentialStore, KNOWN_KEY_VARS};
pub use stub::{StubProvider, StubProviderFactory};

#[cfg(feature = "openai")]
pub use openai::{OpenAiCompatibleFactory, OpenAiCompatibleProvider, OpenAiPreset};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory};

/// Errors from provider clients.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Per-provider generation settings, read from the provider's JSON config.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Model to use
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate (provider default when `None`)
    pub max_tokens: Option<u32>,

    /// Optional system message sent ahead of the prompt
    pub system_prompt: Option<String>,
}

impl GenerationSettings {
    /// Default temperature for evaluation calls.
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: None,
            system_prompt: None,
        }
    }

    /// Read `model`, `temperature`, `max_tokens` and `system_prompt` from
    /// config, falling back to `default_model` when `model` is absent.
    pub fn from_config(
        config: &JsonValue,
        default_model: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let model = config["model"]
            .as_str()
            .or(default_model)
            .ok_or_else(|| ProviderError::NotConfigured("'model' is required".to_string()))?;

        let temperature = match &config["temperature"] {
            JsonValue::Null => Self::DEFAULT_TEMPERATURE,
            value => value.as_f64().ok_or_else(|| {
                ProviderError::NotConfigured("'temperature' must be a number".to_string())
            })? as f32,
        };

        let max_tokens = match &config["max_tokens"] {
            JsonValue::Null => None,
            value => Some(
                value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        ProviderError::NotConfigured(
                            "'max_tokens' must be a positive integer".to_string(),
                        )
                    })?,
            ),
        };

        Ok(Self {
            model: model.to_string(),
            temperature,
            max_tokens,
            system_prompt: config["system_prompt"].as_str().map(str::to_string),
        })
    }
}

/// A chat message for chat-completion backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider abstraction allows swapping rating backends.
///
/// The orchestrator only ever calls [`ProviderClient::generate`]; retries,
/// streaming and token accounting are out of scope for this contract.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send one prompt and return the provider's text.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Backend type, for logs ("openai", "gemini", "stub", ...).
    fn kind(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a helpful assistant.");
        assert_eq!(system.role, "system");

        let user = ChatMessage::user("Rate this idea");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_generation_settings_defaults() {
        let settings = GenerationSettings::from_config(&serde_json::json!({}), Some("gpt-4o")).unwrap();
        assert_eq!(settings, GenerationSettings::new("gpt-4o"));
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.max_tokens, None);
    }

    #[test]
    fn test_generation_settings_from_config() {
        let config = serde_json::json!({
            "model": "sonar",
            "temperature": 0.7,
            "max_tokens": 500,
            "system_prompt": "You are a helpful assistant."
        });
        let settings = GenerationSettings::from_config(&config, None).unwrap();

        assert_eq!(settings.model, "sonar");
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_tokens, Some(500));
        assert_eq!(settings.system_prompt.as_deref(), Some("You are a helpful assistant."));
    }

    #[test]
    fn test_generation_settings_rejects_bad_values() {
        assert!(GenerationSettings::from_config(&serde_json::json!({}), None).is_err());

        let config = serde_json::json!({"model": "m", "temperature": "hot"});
        assert!(GenerationSettings::from_config(&config, None).is_err());

        let config = serde_json::json!({"model": "m", "max_tokens": -5});
        assert!(GenerationSettings::from_config(&config, None).is_err());
    }
}
