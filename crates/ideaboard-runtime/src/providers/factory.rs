//! Provider factory pattern for dynamic backend registration.
//!
//! Backends register factories that create clients from configuration,
//! so new ones are added without touching the orchestrator.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let ctx = ProviderContext::new(&store, Duration::from_secs(60));
//!
//! let provider = registry.create("groq", &json!({"model": "llama3-70b-8192"}), &ctx)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;

use super::{CredentialStore, ProviderClient, ProviderError};

/// Startup state handed to every factory.
#[derive(Debug, Clone, Copy)]
pub struct ProviderContext<'a> {
    /// Credential snapshot taken at startup
    pub credentials: &'a CredentialStore,

    /// Deadline applied to each provider call
    pub request_timeout: Duration,
}

impl<'a> ProviderContext<'a> {
    pub fn new(credentials: &'a CredentialStore, request_timeout: Duration) -> Self {
        Self {
            credentials,
            request_timeout,
        }
    }
}

/// Factory for creating provider clients from configuration.
///
/// Each factory validates its own configuration format, creates client
/// instances and names the type string it answers to.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type ("openai", "gemini", ...).
    fn provider_type(&self) -> &'static str;

    /// Create a client from JSON configuration.
    fn create(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError>;

    /// Validate configuration without creating a client.
    fn validate_config(
        &self,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<(), ProviderError>;

    /// Human-readable description of this provider type.
    fn description(&self) -> &'static str {
        "Rating provider"
    }
}

/// Registry of available provider factories, keyed by type string.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A factory with the same type is replaced.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a client from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        let factory = self.factory(provider_type)?;
        tracing::debug!(provider_type, description = factory.description(), "Creating provider client");
        factory.create(config, ctx)
    }

    /// Validate configuration for a provider type.
    pub fn validate(
        &self,
        provider_type: &str,
        config: &JsonValue,
        ctx: &ProviderContext<'_>,
    ) -> Result<(), ProviderError> {
        self.factory(provider_type)?.validate_config(config, ctx)
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Registry with every built-in backend enabled by the crate features.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::StubProviderFactory));

        #[cfg(feature = "openai")]
        for preset in super::OpenAiPreset::ALL {
            registry.register(Arc::new(super::OpenAiCompatibleFactory::new(preset)));
        }

        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiProviderFactory));

        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
