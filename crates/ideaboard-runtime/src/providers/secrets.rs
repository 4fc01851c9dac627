//! Credential handling for provider clients.
//!
//! Environment variables are read exactly once, at startup, into a
//! [`CredentialStore`] snapshot. Providers receive the store explicitly
//! and never consult the process environment themselves.
//!
//! ## Usage
//!
//! ```ignore
//! let store = CredentialStore::capture(KNOWN_KEY_VARS);
//!
//! // Inline config value first, then the snapshot
//! let cred = ApiCredential::resolve(&config, "OPENAI_API_KEY", &store, "OpenAI API key")?;
//!
//! // Use in HTTP header (explicit exposure)
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use super::ProviderError;

/// Key variables the default provider set knows about.
pub const KNOWN_KEY_VARS: [&str; 4] = [
    "OPENAI_API_KEY",
    "GROQ_API_KEY",
    "GOOGLE_API_KEY",
    "PERPLEXITY_API_KEY",
];

/// Config key holding an inline API key.
pub const API_KEY_FIELD: &str = "api_key";

/// Config key overriding which variable holds the API key.
pub const API_KEY_ENV_FIELD: &str = "api_key_env";

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Inline in the provider's configuration
    Config,
    /// From the startup environment snapshot
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// Snapshot of credential variables taken once at startup.
#[derive(Default)]
pub struct CredentialStore {
    values: BTreeMap<String, SecretString>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the named variables from the process environment. Unset and
    /// empty variables are skipped.
    pub fn capture<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for var in vars {
            let var = var.as_ref();
            if let Ok(value) = std::env::var(var) {
                store.insert(var, value);
            }
        }
        store
    }

    /// Add a value. Empty values are ignored.
    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.values.insert(var.into(), SecretString::from(value));
        }
    }

    /// Builder-style [`CredentialStore::insert`].
    pub fn with(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(var, value);
        self
    }

    /// Whether a value was captured for `var`.
    pub fn has(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    /// Names of the captured variables.
    pub fn available(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    fn lookup(&self, var: &str) -> Option<&str> {
        self.values.get(var).map(|v| v.expose_secret())
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("keys", &self.available())
            .finish()
    }
}

/// A securely-stored API credential.
///
/// Debug and Display show `[REDACTED]`; the value is only reachable
/// through [`ApiCredential::expose`].
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Resolve a credential for a provider config.
    ///
    /// 1. `api_key` in the config
    /// 2. the variable named by `api_key_env` in the config, else `default_var`,
    ///    looked up in the store
    /// 3. `NotConfigured` if neither is set
    pub fn resolve(
        config: &JsonValue,
        default_var: &str,
        store: &CredentialStore,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config[API_KEY_FIELD].as_str() {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        let var = config[API_KEY_ENV_FIELD].as_str().unwrap_or(default_var);
        if let Some(value) = store.lookup(var) {
            return Ok(Self::new(value, CredentialSource::Environment, name));
        }

        Err(ProviderError::NotConfigured(format!(
            "{} required: set '{}' in config or the {} environment variable",
            name, API_KEY_FIELD, var
        )))
    }

    /// Check if a credential is available without loading it.
    pub fn is_available(config: &JsonValue, default_var: &str, store: &CredentialStore) -> bool {
        config[API_KEY_FIELD].as_str().is_some()
            || store.has(config[API_KEY_ENV_FIELD].as_str().unwrap_or(default_var))
    }

    /// Expose the credential value at the point of use.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Test API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_store_debug_lists_keys_only() {
        let store = CredentialStore::new().with("GROQ_API_KEY", "gsk-secret");
        let debug = format!("{:?}", store);
        assert!(debug.contains("GROQ_API_KEY"));
        assert!(!debug.contains("gsk-secret"));
    }

    #[test]
    fn test_store_skips_empty_values() {
        let store = CredentialStore::new().with("OPENAI_API_KEY", "");
        assert!(!store.has("OPENAI_API_KEY"));
        assert!(store.available().is_empty());
    }

    #[test]
    fn test_resolve_prefers_inline_config() {
        let config = serde_json::json!({ "api_key": "config-key" });
        let store = CredentialStore::new().with("OPENAI_API_KEY", "env-key");

        let cred = ApiCredential::resolve(&config, "OPENAI_API_KEY", &store, "Test key").unwrap();
        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_resolve_falls_back_to_store() {
        let store = CredentialStore::new().with("OPENAI_API_KEY", "env-key");

        let cred =
            ApiCredential::resolve(&serde_json::json!({}), "OPENAI_API_KEY", &store, "Test key")
                .unwrap();
        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_resolve_honours_api_key_env_override() {
        let config = serde_json::json!({ "api_key_env": "TEAM_OPENAI_KEY" });
        let store = CredentialStore::new()
            .with("OPENAI_API_KEY", "default")
            .with("TEAM_OPENAI_KEY", "team");

        let cred = ApiCredential::resolve(&config, "OPENAI_API_KEY", &store, "Test key").unwrap();
        assert_eq!(cred.expose(), "team");
    }

    #[test]
    fn test_resolve_error_when_missing() {
        let err = ApiCredential::resolve(
            &serde_json::json!({}),
            "NONEXISTENT_VAR_12345",
            &CredentialStore::new(),
            "Test key",
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Test key"));
        assert!(message.contains("api_key"));
        assert!(message.contains("NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_is_available() {
        let store = CredentialStore::new().with("GOOGLE_API_KEY", "g");
        assert!(ApiCredential::is_available(&serde_json::json!({}), "GOOGLE_API_KEY", &store));
        assert!(ApiCredential::is_available(
            &serde_json::json!({"api_key": "x"}),
            "NONEXISTENT",
            &store
        ));
        assert!(!ApiCredential::is_available(&serde_json::json!({}), "NONEXISTENT", &store));
    }
}
