//! Google Gemini provider (`generateContent` API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::{ProviderContext, ProviderFactory},
    http,
    secrets::ApiCredential,
    GenerationSettings, ProviderClient, ProviderError,
};

/// Environment variable name for the Gemini API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini client.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    settings: GenerationSettings,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl GeminiProvider {
    /// Create from JSON configuration.
    pub fn from_config(config: &JsonValue, ctx: &ProviderContext<'_>) -> Result<Self, ProviderError> {
        let credential =
            ApiCredential::resolve(config, GOOGLE_API_KEY_ENV, ctx.credentials, "Google API key")?;

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            credential,
            base_url,
            settings: GenerationSettings::from_config(config, Some(DEFAULT_MODEL))?,
            timeout: ctx.request_timeout,
            client: http::build_client(ctx.request_timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.settings.model)
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: self.settings.system_prompt.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ProviderClient for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.credential.expose())
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| http::transport_error(e, self.timeout))?;

        let body: GenerateContentResponse = http::decode_response(response, self.timeout).await?;

        let content = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| ProviderError::ParseError("response has no candidates".to_string()))?;

        let text = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text.trim().to_string())
    }

    fn kind(&self) -> &str {
        "gemini"
    }
}

/// Factory for Gemini providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "model": "gemini-1.5-flash",  // Optional
///   "temperature": 0.2,           // Optional
///   "max_tokens": 800,            // Optional, sent as maxOutputTokens
///   "base_url": "https://...",    // Optional
///   "api_key": "..."              // Optional, falls back to GOOGLE_API_KEY
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_config(config, ctx)?))
    }

    fn validate_config(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, GOOGLE_API_KEY_ENV, ctx.credentials) {
            return Err(ProviderError::NotConfigured(format!(
                "Google API key required: set 'api_key' in config or {} env",
                GOOGLE_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        GenerationSettings::from_config(config, Some(DEFAULT_MODEL)).map(|_| ())
    }

    fn description(&self) -> &'static str {
        "Google Gemini generateContent provider"
    }
}
