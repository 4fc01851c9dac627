//! Evaluation orchestrator.
//!
//! Fans each idea out to every configured provider and collects one
//! [`EvaluationRecord`] per provider. A provider that errors or times out
//! becomes an error record for that idea; it never aborts the idea, the
//! other providers, or the remaining ideas.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use ideaboard_core::{EvaluationMatrix, EvaluationRecord, IdeaEvaluations, IdeaRecord, ResponseParser};

use crate::config::ExecutionMode;
use crate::prompts::EvaluationPromptBuilder;
use crate::providers::ProviderClient;
use crate::stats::RunStats;

/// Errors from building an orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No providers configured")]
    NoProviders,
}

/// Named providers in configuration order.
#[derive(Clone, Default)]
pub struct ProviderSet {
    entries: Vec<(String, Arc<dyn ProviderClient>)>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; a repeated name replaces the earlier client in place.
    pub fn insert(&mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = client,
            None => self.entries.push((name, client)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        self.insert(name, client);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, client)| client)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ProviderClient>)> {
        self.entries.iter().map(|(name, client)| (name.as_str(), client))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, client)| (name, client.kind())))
            .finish()
    }
}

/// Result of a run that may be interrupted.
#[derive(Debug)]
pub struct RunOutcome {
    /// Every idea evaluated before the run stopped. An interrupted idea
    /// keeps only the provider records that finished before the signal.
    pub matrix: EvaluationMatrix,

    /// Whether the shutdown signal fired before all ideas were done
    pub cancelled: bool,
}

/// Drives provider calls for every idea.
///
/// # Architecture
/// - One prompt per idea, shared by all providers
/// - Sequential or parallel fan-out per idea, ideas one after another
/// - Raw text goes through the [`ResponseParser`]; errors become records
pub struct EvaluationOrchestrator {
    providers: ProviderSet,
    prompts: EvaluationPromptBuilder,
    parser: ResponseParser,
    mode: ExecutionMode,
    stats: Arc<RunStats>,
}

impl EvaluationOrchestrator {
    pub fn builder() -> EvaluationOrchestratorBuilder {
        EvaluationOrchestratorBuilder::new()
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run statistics shared with the caller.
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Evaluate one idea with every provider.
    ///
    /// Always returns one record per provider, in provider order.
    pub async fn evaluate(&self, idea: &IdeaRecord) -> IdeaEvaluations {
        let mut slots = self.empty_slots();
        self.fill_slots(idea, &mut slots).await;
        let evaluations = self.collect_slots(slots);

        tracing::info!(
            idea = %idea.id,
            successful = ?evaluations.successful(),
            failed = ?evaluations.failed(),
            "Idea evaluated"
        );

        evaluations
    }

    /// Evaluate every idea in order.
    pub async fn evaluate_all(&self, ideas: &[IdeaRecord]) -> EvaluationMatrix {
        self.evaluate_all_until(ideas, std::future::pending::<()>())
            .await
            .matrix
    }

    /// Evaluate every idea in order, stopping early when `shutdown`
    /// completes. Provider records that finished for the interrupted idea
    /// are kept; providers still in flight are dropped.
    pub async fn evaluate_all_until<F>(&self, ideas: &[IdeaRecord], shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut matrix = EvaluationMatrix::new();
        let total = ideas.len();

        for (index, idea) in ideas.iter().enumerate() {
            tracing::info!(
                idea = %idea.id,
                title = %idea.title,
                "Evaluating idea {}/{}",
                index + 1,
                total
            );

            let mut slots = self.empty_slots();
            let interrupted = tokio::select! {
                biased;
                _ = &mut shutdown => true,
                _ = self.fill_slots(idea, &mut slots) => false,
            };
            let evaluations = self.collect_slots(slots);

            if interrupted {
                tracing::warn!(
                    idea = %idea.id,
                    completed = index,
                    remaining = total - index,
                    finished_providers = evaluations.len(),
                    "Shutdown requested, stopping evaluation"
                );
                if !evaluations.is_empty() {
                    matrix.insert(idea.id.clone(), evaluations);
                }
                return RunOutcome { matrix, cancelled: true };
            }

            tracing::info!(
                idea = %idea.id,
                successful = ?evaluations.successful(),
                failed = ?evaluations.failed(),
                "Idea evaluated"
            );
            matrix.insert(idea.id.clone(), evaluations);
        }

        RunOutcome {
            matrix,
            cancelled: false,
        }
    }

    fn empty_slots(&self) -> Vec<Option<EvaluationRecord>> {
        (0..self.providers.len()).map(|_| None).collect()
    }

    /// Call every provider for `idea`, storing each record in its provider's
    /// slot as soon as it arrives.
    async fn fill_slots(&self, idea: &IdeaRecord, slots: &mut [Option<EvaluationRecord>]) {
        let prompt = self.prompts.build(idea);

        match self.mode {
            ExecutionMode::Sequential => {
                for (slot, (name, client)) in slots.iter_mut().zip(self.providers.iter()) {
                    *slot = Some(self.call_provider(idea, name, client, &prompt).await);
                }
            }
            ExecutionMode::Parallel => {
                let prompt = prompt.as_str();
                let mut pending: FuturesUnordered<_> = self
                    .providers
                    .iter()
                    .enumerate()
                    .map(|(index, (name, client))| async move {
                        (index, self.call_provider(idea, name, client, prompt).await)
                    })
                    .collect();
                while let Some((index, record)) = pending.next().await {
                    slots[index] = Some(record);
                }
            }
        }
    }

    /// Finished records keyed by provider name, in provider order.
    fn collect_slots(&self, slots: Vec<Option<EvaluationRecord>>) -> IdeaEvaluations {
        self.providers
            .names()
            .into_iter()
            .zip(slots)
            .filter_map(|(name, record)| record.map(|record| (name.to_string(), record)))
            .collect()
    }

    async fn call_provider(
        &self,
        idea: &IdeaRecord,
        name: &str,
        client: &Arc<dyn ProviderClient>,
        prompt: &str,
    ) -> EvaluationRecord {
        tracing::debug!(idea = %idea.id, provider = %name, kind = client.kind(), "Calling provider");

        let record = match client.generate(prompt).await {
            Ok(text) => {
                tracing::debug!(idea = %idea.id, provider = %name, chars = text.len(), "Response received");
                let record = self.parser.parse(&text);
                if record.is_error() {
                    tracing::warn!(
                        idea = %idea.id,
                        provider = %name,
                        "Response contained no recognizable ratings"
                    );
                }
                record
            }
            Err(e) => {
                tracing::warn!(idea = %idea.id, provider = %name, error = %e, "Provider call failed");
                EvaluationRecord::provider_failure(e.to_string())
            }
        };

        self.stats.record(name, &record);
        record
    }
}

/// Builder for [`EvaluationOrchestrator`].
#[derive(Default)]
pub struct EvaluationOrchestratorBuilder {
    providers: ProviderSet,
    prompts: Option<EvaluationPromptBuilder>,
    parser: Option<ResponseParser>,
    mode: ExecutionMode,
    stats: Option<Arc<RunStats>>,
}

impl EvaluationOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn providers(mut self, providers: ProviderSet) -> Self {
        self.providers = providers;
        self
    }

    /// Add a single provider.
    pub fn provider(mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        self.providers.insert(name, client);
        self
    }

    pub fn prompts(mut self, prompts: EvaluationPromptBuilder) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn parser(mut self, parser: ResponseParser) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn stats(mut self, stats: Arc<RunStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn build(self) -> Result<EvaluationOrchestrator, OrchestratorError> {
        if self.providers.is_empty() {
            return Err(OrchestratorError::NoProviders);
        }

        Ok(EvaluationOrchestrator {
            providers: self.providers,
            prompts: self.prompts.unwrap_or_default(),
            parser: self.parser.unwrap_or_default(),
            mode: self.mode,
            stats: self.stats.unwrap_or_default(),
        })
    }
}
