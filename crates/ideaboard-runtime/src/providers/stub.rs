//! Deterministic scripted provider for tests and offline runs.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::{ProviderContext, ProviderFactory},
    ProviderClient, ProviderError,
};

/// Replies with scripted responses in order, wrapping around, or always
/// fails with a configured message.
#[derive(Debug)]
pub struct StubProvider {
    responses: Vec<String>,
    failure: Option<String>,
    latency: Option<Duration>,
    cursor: AtomicUsize,
}

impl StubProvider {
    /// Cycle through `responses`.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            failure: None,
            latency: None,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Fail every call with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            responses: Vec::new(),
            failure: Some(message.into()),
            latency: None,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Create from JSON configuration.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let latency = match config["latency"].as_str() {
            Some(text) => Some(humantime::parse_duration(text).map_err(|e| {
                ProviderError::NotConfigured(format!("invalid stub latency '{text}': {e}"))
            })?),
            None => None,
        };

        let mut provider = if let Some(message) = config["fail"].as_str() {
            Self::failing(message)
        } else {
            let responses: Vec<String> = match &config["responses"] {
                JsonValue::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            ProviderError::NotConfigured(
                                "stub responses must be strings".to_string(),
                            )
                        })
                    })
                    .collect::<Result<_, _>>()?,
                JsonValue::String(single) => vec![single.clone()],
                _ => Vec::new(),
            };
            if responses.is_empty() {
                return Err(ProviderError::NotConfigured(
                    "stub provider needs 'responses' or 'fail'".to_string(),
                ));
            }
            Self::new(responses)
        };

        provider.latency = latency;
        Ok(provider)
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for StubProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        let call = self.cursor.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = &self.failure {
            return Err(ProviderError::HttpError(message.clone()));
        }

        if self.responses.is_empty() {
            return Err(ProviderError::NotConfigured(
                "stub provider has no responses".to_string(),
            ));
        }

        Ok(self.responses[call % self.responses.len()].clone())
    }

    fn kind(&self) -> &str {
        "stub"
    }
}

/// Factory for stub providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "responses": ["...", "..."],  // Replies, cycled in order
///   "fail": "quota exceeded",     // Alternative: fail every call
///   "latency": "50ms"             // Optional delay per call
/// }
/// ```
pub struct StubProviderFactory;

impl ProviderFactory for StubProviderFactory {
    fn provider_type(&self) -> &'static str {
        "stub"
    }

    fn create(
        &self,
        config: &JsonValue,
        _ctx: &ProviderContext<'_>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        Ok(Arc::new(StubProvider::from_config(config)?))
    }

    fn validate_config(
        &self,
        config: &JsonValue,
        _ctx: &ProviderContext<'_>,
    ) -> Result<(), ProviderError> {
        StubProvider::from_config(config).map(|_| ())
    }

    fn description(&self) -> &'static str {
        "Scripted provider for tests and offline runs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_cycle_in_order() {
        let provider = StubProvider::new(["first", "second"]);

        assert_eq!(provider.generate("p").await.unwrap(), "first");
        assert_eq!(provider.generate("p").await.unwrap(), "second");
        assert_eq!(provider.generate("p").await.unwrap(), "first");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_stub() {
        let provider = StubProvider::failing("quota exceeded");
        let err = provider.generate("p").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_from_config() {
        let provider = StubProvider::from_config(&serde_json::json!({
            "responses": ["This is a mock response from LLM 1"],
            "latency": "1ms"
        }))
        .unwrap();

        assert_eq!(provider.latency, Some(Duration::from_millis(1)));
        assert_eq!(
            provider.generate("p").await.unwrap(),
            "This is a mock response from LLM 1"
        );

        let failing = StubProvider::from_config(&serde_json::json!({"fail": "down"})).unwrap();
        assert!(failing.generate("p").await.is_err());
    }

    #[test]
    fn test_from_config_rejects_empty_script() {
        assert!(StubProvider::from_config(&serde_json::json!({})).is_err());
        assert!(StubProvider::from_config(&serde_json::json!({"responses": []})).is_err());
        assert!(StubProvider::from_config(&serde_json::json!({"responses": [1]})).is_err());
        assert!(StubProvider::from_config(&serde_json::json!({
            "responses": ["ok"],
            "latency": "soon"
        }))
        .is_err());
    }
}
