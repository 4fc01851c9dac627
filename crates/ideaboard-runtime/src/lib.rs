//! # ideaboard-runtime
//!
//! Provider clients and evaluation orchestration for ideaboard.
//!
//! This crate owns everything that touches the network or the clock:
//! hosted LLM clients behind the [`ProviderClient`] trait, configuration,
//! credential capture, and the [`EvaluationOrchestrator`] that fans every
//! idea out to every provider. Parsing and aggregation stay in
//! `ideaboard-core`, which is fully deterministic.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideaboard_runtime::{CredentialStore, EvaluatorConfig, EvaluationOrchestrator, ProviderRegistry};
//!
//! let config = EvaluatorConfig::from_yaml_file("ideaboard.yaml")?;
//! let store = CredentialStore::capture(&config.credential_vars());
//! let providers = config.build_providers(&ProviderRegistry::with_defaults(), &store)?;
//!
//! let orchestrator = EvaluationOrchestrator::builder()
//!     .providers(providers)
//!     .mode(config.mode)
//!     .build()?;
//!
//! let matrix = orchestrator.evaluate_all(&ideas).await;
//! ```

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod stats;

pub use config::{
    default_providers, ConfigError, EvaluatorConfig, ExecutionMode, ProviderSpec,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use orchestrator::{
    EvaluationOrchestrator, EvaluationOrchestratorBuilder, OrchestratorError, ProviderSet,
    RunOutcome,
};
pub use prompts::{EvaluationPromptBuilder, EVALUATION_PROMPT};
pub use providers::{
    ApiCredential, ChatMessage, CredentialStore, GenerationSettings, ProviderClient,
    ProviderContext, ProviderError, ProviderFactory, ProviderRegistry, StubProvider, KNOWN_KEY_VARS,
};
