//! OpenAI-compatible chat-completion provider.
//!
//! One adapter covers every backend speaking the `/chat/completions`
//! dialect with bearer auth. Presets fill in the base URL, credential
//! variable and default model for OpenAI, Groq and Perplexity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::{ProviderContext, ProviderFactory},
    http,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, GenerationSettings, ProviderClient, ProviderError,
};

/// Connection defaults for one OpenAI-compatible backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAiPreset {
    /// Registry type string
    pub provider_type: &'static str,

    /// Base URL, `None` when the config must supply one
    pub base_url: Option<&'static str>,

    /// Variable holding the API key
    pub key_var: &'static str,

    /// Human-readable credential name for errors
    pub credential_name: &'static str,

    /// Model used when the config names none
    pub default_model: Option<&'static str>,
}

impl OpenAiPreset {
    pub const OPENAI: OpenAiPreset = OpenAiPreset {
        provider_type: "openai",
        base_url: Some("https://api.openai.com/v1"),
        key_var: "OPENAI_API_KEY",
        credential_name: "OpenAI API key",
        default_model: Some("gpt-4o"),
    };

    pub const GROQ: OpenAiPreset = OpenAiPreset {
        provider_type: "groq",
        base_url: Some("https://api.groq.com/openai/v1"),
        key_var: "GROQ_API_KEY",
        credential_name: "Groq API key",
        default_model: Some("llama3-70b-8192"),
    };

    pub const PERPLEXITY: OpenAiPreset = OpenAiPreset {
        provider_type: "perplexity",
        base_url: Some("https://api.perplexity.ai"),
        key_var: "PERPLEXITY_API_KEY",
        credential_name: "Perplexity API key",
        default_model: Some("sonar"),
    };

    /// Any other endpoint: `base_url` and `model` must be configured.
    pub const GENERIC: OpenAiPreset = OpenAiPreset {
        provider_type: "openai-compatible",
        base_url: None,
        key_var: "OPENAI_API_KEY",
        credential_name: "API key",
        default_model: None,
    };

    pub const ALL: [OpenAiPreset; 4] = [
        Self::OPENAI,
        Self::GROQ,
        Self::PERPLEXITY,
        Self::GENERIC,
    ];
}

/// Client for one OpenAI-compatible backend.
pub struct OpenAiCompatibleProvider {
    credential: ApiCredential,
    base_url: String,
    settings: GenerationSettings,
    timeout: Duration,
    kind: &'static str,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("kind", &self.kind)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    /// Create a provider with an explicit key and endpoint.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        settings: GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, "API key"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
            timeout,
            kind: OpenAiPreset::GENERIC.provider_type,
            client: http::build_client(timeout)?,
        })
    }

    /// Create from JSON configuration using a preset's defaults.
    pub fn from_config(
        preset: OpenAiPreset,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<Self, ProviderError> {
        let credential = ApiCredential::resolve(
            config,
            preset.key_var,
            ctx.credentials,
            preset.credential_name,
        )?;

        let base_url = config["base_url"]
            .as_str()
            .or(preset.base_url)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "'base_url' is required for {}",
                    preset.provider_type
                ))
            })?
            .trim_end_matches('/')
            .to_string();

        let settings = GenerationSettings::from_config(config, preset.default_model)?;

        Ok(Self {
            credential,
            base_url,
            settings,
            timeout: ctx.request_timeout,
            kind: preset.provider_type,
            client: http::build_client(ctx.request_timeout)?,
        })
    }

    fn messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.settings.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

/// Chat-completion request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: self.messages(prompt),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        // Only expose the credential here, at the point of use
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport_error(e, self.timeout))?;

        let body: ChatCompletionResponse = http::decode_response(response, self.timeout).await?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }

    fn kind(&self) -> &str {
        self.kind
    }
}

/// Factory for one OpenAI-compatible preset.
///
/// ## Configuration Format
/// ```json
/// {
///   "model": "gpt-4o",               // Optional when the preset has a default
///   "temperature": 0.2,              // Optional
///   "max_tokens": 500,               // Optional
///   "system_prompt": "...",          // Optional
///   "base_url": "https://...",       // Required for openai-compatible
///   "api_key": "sk-...",             // Optional, inline key
///   "api_key_env": "TEAM_OPENAI_KEY" // Optional, overrides the preset variable
/// }
/// ```
pub struct OpenAiCompatibleFactory {
    preset: OpenAiPreset,
}

impl OpenAiCompatibleFactory {
    pub fn new(preset: OpenAiPreset) -> Self {
        Self { preset }
    }
}

impl ProviderFactory for OpenAiCompatibleFactory {
    fn provider_type(&self) -> &'static str {
        self.preset.provider_type
    }

    fn create(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        Ok(Arc::new(OpenAiCompatibleProvider::from_config(
            self.preset,
            config,
            ctx,
        )?))
    }

    fn validate_config(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, self.preset.key_var, ctx.credentials) {
            return Err(ProviderError::NotConfigured(format!(
                "{} required: set 'api_key' in config or {} env",
                self.preset.credential_name, self.preset.key_var
            )));
        }

        match config["base_url"].as_str() {
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
            None if self.preset.base_url.is_none() => {
                return Err(ProviderError::NotConfigured(format!(
                    "'base_url' is required for {}",
                    self.preset.provider_type
                )));
            }
            _ => {}
        }

        GenerationSettings::from_config(config, self.preset.default_model).map(|_| ())
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat-completion provider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialStore;

    fn store() -> CredentialStore {
        CredentialStore::new()
            .with("OPENAI_API_KEY", "sk-openai-secret")
            .with("GROQ_API_KEY", "gsk-groq-secret")
    }

    #[test]
    fn test_groq_preset_from_store() {
        let store = store();
        let ctx = ProviderContext::new(&store, Duration::from_secs(5));
        let provider =
            OpenAiCompatibleProvider::from_config(OpenAiPreset::GROQ, &serde_json::json!({}), &ctx)
                .unwrap();

        assert_eq!(provider.kind(), "groq");
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(provider.settings.model, "llama3-70b-8192");
        assert_eq!(provider.credential.expose(), "gsk-groq-secret");
        assert_eq!(provider.credential.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let store = CredentialStore::new();
        let ctx = ProviderContext::new(&store, Duration::from_secs(5));
        let result = OpenAiCompatibleProvider::from_config(
            OpenAiPreset::PERPLEXITY,
            &serde_json::json!({}),
            &ctx,
        );

        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_generic_preset_requires_base_url_and_model() {
        let store = store();
        let ctx = ProviderContext::new(&store, Duration::from_secs(5));
        let factory = OpenAiCompatibleFactory::new(OpenAiPreset::GENERIC);

        assert!(factory.validate_config(&serde_json::json!({"model": "m"}), &ctx).is_err());
        assert!(factory
            .validate_config(&serde_json::json!({"base_url": "http://localhost:8080/v1"}), &ctx)
            .is_err());
        assert!(factory
            .validate_config(
                &serde_json::json!({"base_url": "http://localhost:8080/v1", "model": "m"}),
                &ctx
            )
            .is_ok());
    }

    #[test]
    fn test_factory_validate_invalid_base_url() {
        let store = store();
        let ctx = ProviderContext::new(&store, Duration::from_secs(5));
        let factory = OpenAiCompatibleFactory::new(OpenAiPreset::OPENAI);

        let config = serde_json::json!({"base_url": "invalid-url"});
        assert!(factory.validate_config(&config, &ctx).is_err());
    }

    #[test]
    fn test_system_prompt_precedes_user_message() {
        let store = store();
        let ctx = ProviderContext::new(&store, Duration::from_secs(5));
        let config = serde_json::json!({"system_prompt": "You are a helpful assistant."});
        let provider =
            OpenAiCompatibleProvider::from_config(OpenAiPreset::OPENAI, &config, &ctx).unwrap();

        let messages = provider.messages("Rate E1");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("You are a helpful assistant."));
        assert_eq!(messages[1], ChatMessage::user("Rate E1"));
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let provider = OpenAiCompatibleProvider::new(
            "sk-super-secret-key-12345",
            "https://api.openai.com/v1/",
            GenerationSettings::new("gpt-4o"),
            Duration::from_secs(5),
        )
        .unwrap();

        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains("sk-super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }
}
