//! Per-provider run statistics.
//!
//! Shared across concurrent provider calls; every recorded
//! [`EvaluationRecord`] updates one provider's counters.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

use ideaboard_core::EvaluationRecord;

/// Counters for one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    /// Calls made
    pub calls: u32,

    /// Calls where the provider itself failed
    pub failures: u32,

    /// Calls that returned text with no recoverable dimension
    pub unparseable: u32,

    /// Dimensions recovered across all calls
    pub dimensions_recovered: u32,
}

impl ProviderStats {
    /// Calls that produced at least one dimension.
    pub fn successes(&self) -> u32 {
        self.calls - self.failures - self.unparseable
    }

    fn add(&mut self, record: &EvaluationRecord) {
        self.calls += 1;
        match record {
            EvaluationRecord::Rated(ratings) => {
                self.dimensions_recovered += ratings.len() as u32;
            }
            EvaluationRecord::Failed(failure) if failure.raw_response.is_some() => {
                self.unparseable += 1;
            }
            EvaluationRecord::Failed(_) => {
                self.failures += 1;
            }
        }
    }
}

/// Statistics for a whole run.
#[derive(Debug)]
pub struct RunStats {
    started_at: DateTime<Utc>,
    providers: RwLock<BTreeMap<String, ProviderStats>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            providers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record the outcome of one provider call.
    pub fn record(&self, provider: &str, record: &EvaluationRecord) {
        self.providers
            .write()
            .entry(provider.to_string())
            .or_default()
            .add(record);
    }

    /// Counters for one provider.
    pub fn provider(&self, provider: &str) -> Option<ProviderStats> {
        self.providers.read().get(provider).copied()
    }

    /// Copy of every provider's counters.
    pub fn snapshot(&self) -> BTreeMap<String, ProviderStats> {
        self.providers.read().clone()
    }

    /// Total calls across providers.
    pub fn total_calls(&self) -> u32 {
        self.providers.read().values().map(|s| s.calls).sum()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Emit one log line per provider.
    pub fn log_summary(&self) {
        let elapsed = Utc::now() - self.started_at;
        for (provider, stats) in self.providers.read().iter() {
            tracing::info!(
                provider = %provider,
                calls = stats.calls,
                succeeded = stats.successes(),
                failures = stats.failures,
                unparseable = stats.unparseable,
                dimensions = stats.dimensions_recovered,
                "Provider summary"
            );
        }
        tracing::info!(
            total_calls = self.total_calls(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Run statistics"
        );
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}
