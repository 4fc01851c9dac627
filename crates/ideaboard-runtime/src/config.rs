//! Run configuration.
//!
//! ```yaml
//! mode: parallel            # or sequential (default)
//! request_timeout: 60s      # per provider call
//! providers:
//!   - name: GPT-4
//!     type: openai
//!     model: gpt-4o
//!     temperature: 0.2
//!   - name: Perplexity-Sonar
//!     type: perplexity
//!     temperature: 0.7
//!     max_tokens: 500
//!     system_prompt: You are a helpful assistant.
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::orchestrator::ProviderSet;
use crate::providers::secrets::API_KEY_ENV_FIELD;
use crate::providers::{CredentialStore, ProviderContext, ProviderError, ProviderRegistry, KNOWN_KEY_VARS};

/// Default deadline for one provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur when loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("Provider '{name}' has unknown type '{provider_type}'. Available: {available:?}")]
    UnknownProviderType {
        name: String,
        provider_type: String,
        available: Vec<String>,
    },

    #[error("Provider '{name}' could not be created: {source}")]
    Provider {
        name: String,
        #[source]
        source: ProviderError,
    },
}

/// How providers are scheduled within one idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One provider after another
    #[default]
    Sequential,

    /// All providers of an idea at once
    Parallel,
}

/// One configured provider: display name, registry type, and the
/// remaining keys as the factory's JSON settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Display label, also the key in the evaluation matrix
    pub name: String,

    /// Registered factory type ("openai", "groq", "gemini", "stub", ...)
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Everything else
    #[serde(flatten)]
    pub settings: Map<String, JsonValue>,
}

impl ProviderSpec {
    /// `settings` must be a JSON object; anything else becomes empty settings.
    pub fn new(
        name: impl Into<String>,
        provider_type: impl Into<String>,
        settings: JsonValue,
    ) -> Self {
        let settings = match settings {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            provider_type: provider_type.into(),
            settings,
        }
    }

    /// Settings as a JSON value for the factory.
    pub fn settings_value(&self) -> JsonValue {
        JsonValue::Object(self.settings.clone())
    }
}

/// Top-level evaluator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,

    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

fn serialize_duration<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

impl EvaluatorConfig {
    /// Parse and validate a YAML config.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EvaluatorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Config using the default provider set for the available credentials.
    pub fn defaults(store: &CredentialStore) -> Self {
        Self {
            providers: default_providers(store),
            mode: ExecutionMode::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Check structure: at least one provider, unique non-empty names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one provider is required".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.providers {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "provider name must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate provider name: {}",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Environment variables to snapshot for this config: the known key
    /// variables plus any `api_key_env` overrides.
    pub fn credential_vars(&self) -> Vec<String> {
        let mut vars: Vec<String> = KNOWN_KEY_VARS.iter().map(|v| v.to_string()).collect();
        for spec in &self.providers {
            if let Some(var) = spec.settings.get(API_KEY_ENV_FIELD).and_then(JsonValue::as_str) {
                if !vars.iter().any(|v| v == var) {
                    vars.push(var.to_string());
                }
            }
        }
        vars
    }

    /// Create every configured provider, in config order.
    pub fn build_providers(
        &self,
        registry: &ProviderRegistry,
        store: &CredentialStore,
    ) -> Result<ProviderSet, ConfigError> {
        let ctx = ProviderContext::new(store, self.request_timeout);
        let mut providers = ProviderSet::new();

        for spec in &self.providers {
            if !registry.has_provider(&spec.provider_type) {
                return Err(ConfigError::UnknownProviderType {
                    name: spec.name.clone(),
                    provider_type: spec.provider_type.clone(),
                    available: registry
                        .available_types()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                });
            }

            let settings = spec.settings_value();
            let client = registry
                .validate(&spec.provider_type, &settings, &ctx)
                .and_then(|()| registry.create(&spec.provider_type, &settings, &ctx))
                .map_err(|source| ConfigError::Provider {
                    name: spec.name.clone(),
                    source,
                })?;

            tracing::debug!(provider = %spec.name, kind = client.kind(), "Provider ready");
            providers.insert(spec.name.clone(), client);
        }

        Ok(providers)
    }
}

/// Default provider set: one hosted provider per available key, or four
/// scripted stand-ins when no key is set.
pub fn default_providers(store: &CredentialStore) -> Vec<ProviderSpec> {
    let mut specs = Vec::new();

    if store.has("OPENAI_API_KEY") {
        specs.push(ProviderSpec::new(
            "GPT-4",
            "openai",
            json!({ "model": "gpt-4o", "temperature": 0.2 }),
        ));
    }

    if store.has("GROQ_API_KEY") {
        specs.push(ProviderSpec::new(
            "LLaMA-3-70B",
            "groq",
            json!({ "model": "llama3-70b-8192", "temperature": 0.2 }),
        ));
    }

    if store.has("GOOGLE_API_KEY") {
        specs.push(ProviderSpec::new(
            "Gemini-1.5-Flash",
            "gemini",
            json!({ "model": "gemini-1.5-flash", "temperature": 0.2 }),
        ));
    }

    if store.has("PERPLEXITY_API_KEY") {
        specs.push(ProviderSpec::new(
            "Perplexity-Sonar",
            "perplexity",
            json!({
                "model": "sonar",
                "temperature": 0.7,
                "max_tokens": 500,
                "system_prompt": "You are a helpful assistant."
            }),
        ));
    }

    if specs.is_empty() {
        tracing::warn!("No API keys found, using mock providers");
        for n in 1..=4 {
            specs.push(ProviderSpec::new(
                format!("Mock-LLM-{n}"),
                "stub",
                json!({ "responses": [format!("This is a mock response from LLM {n}")] }),
            ));
        }
    } else {
        tracing::info!(keys = ?store.available(), "Found API keys");
    }

    specs
}
