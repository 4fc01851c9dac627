//! Provider response parsing.
//!
//! Providers are asked for a strict JSON object but routinely wrap it in
//! prose, rename keys, break the syntax, or answer in plain text. The
//! [`ResponseParser`] runs an ordered list of [`ExtractionStrategy`] tiers
//! and merges what each one finds into a single record:
//!
//! 1. [`StrictJson`]: decode the text (or its outermost `{...}` span)
//! 2. [`KeyRepair`]: regex salvage of `"<key>" ... "score" ... N`
//! 3. [`FreeText`]: `Label: N/10` prose, only when no JSON object decoded
//!
//! A tier only fills dimensions that are still missing. When nothing is
//! recovered the result is an error sentinel carrying the raw text.

mod patterns;
mod strategies;

pub use patterns::{trailing_remark, DimensionPatterns};
pub use strategies::{
    locate_document, ExtractionContext, ExtractionStrategy, FreeText, KeyRepair, StrictJson,
};

use crate::types::{EvaluationRecord, Ratings};

/// Multi-tier parser from raw provider text to an [`EvaluationRecord`].
pub struct ResponseParser {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ResponseParser {
    /// Parser with the standard three tiers.
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(StrictJson),
            Box::new(KeyRepair),
            Box::new(FreeText),
        ])
    }

    /// Parser with a custom, ordered list of tiers.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the configured tiers, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Parse raw provider text. Never fails: unusable text becomes the
    /// `unparseable response` sentinel.
    pub fn parse(&self, raw: &str) -> EvaluationRecord {
        let document = locate_document(raw);
        let ctx = ExtractionContext {
            raw,
            document: document.as_ref(),
        };

        let mut ratings = Ratings::new();
        for strategy in &self.strategies {
            if ratings.is_complete() {
                break;
            }
            if !strategy.applies(&ctx) {
                continue;
            }

            let wanted = ratings.missing();
            let Some(found) = strategy.extract(&ctx, &wanted) else {
                continue;
            };

            let mut recovered = 0;
            for (dimension, rating) in found.dimensions {
                if ratings.fill(dimension, rating) {
                    recovered += 1;
                }
            }
            if ratings.overall_impression.is_none() {
                ratings.overall_impression = found.overall_impression;
            }

            tracing::debug!(
                strategy = strategy.name(),
                recovered,
                total = ratings.len(),
                "Extraction tier recovered dimensions"
            );
        }

        if ratings.is_empty() {
            tracing::warn!(
                preview = %preview(raw),
                "No dimension recoverable from response"
            );
            return EvaluationRecord::unparseable(raw);
        }

        if !ratings.is_complete() {
            tracing::warn!(missing = ?ratings.missing(), "Partial evaluation accepted");
        }

        EvaluationRecord::Rated(ratings)
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse with the standard tiers.
pub fn parse_response(raw: &str) -> EvaluationRecord {
    ResponseParser::new().parse(raw)
}

fn preview(raw: &str) -> String {
    raw.chars().take(100).collect()
}
