//! Aggregator: reduces the evaluation matrix into detail and summary tables.
//!
//! Policy:
//! 1. Error sentinels contribute nothing, neither detail rows nor averages
//! 2. A provider missing a dimension is excluded from that dimension's
//!    average, never counted as zero
//! 3. A dimension nobody rated averages to `0.0` and still counts toward
//!    the overall average
//! 4. Dimension averages are rounded to one decimal, then the overall
//!    average of the seven rounded values is rounded again
//! 5. Summary rows are sorted by descending overall average; ties keep
//!    the input idea order

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{Dimension, EvaluationMatrix, IdeaRecord};

/// One (idea, provider, dimension) rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub idea_id: String,
    pub idea_title: String,
    pub provider: String,
    pub dimension: Dimension,
    pub score: i64,
    pub remark: String,
}

impl DetailRow {
    /// Human-readable dimension label for tabular output.
    pub fn dimension_label(&self) -> &'static str {
        self.dimension.label()
    }
}

/// Cross-provider averages for one idea.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub idea_id: String,
    pub idea_title: String,
    pub averages: BTreeMap<Dimension, f64>,
    pub overall_average: f64,
}

impl SummaryRow {
    /// Average for a dimension (`0.0` when nobody rated it).
    pub fn average(&self, dimension: Dimension) -> f64 {
        self.averages.get(&dimension).copied().unwrap_or(0.0)
    }
}

pub type DetailTable = Vec<DetailRow>;
pub type SummaryTable = Vec<SummaryRow>;

/// The Aggregator turns provider-level records into ranked summary statistics.
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Build both tables.
    ///
    /// Ideas absent from the matrix (e.g. a cancelled run) still get a
    /// summary row, with every average at `0.0`.
    pub fn aggregate(
        &self,
        matrix: &EvaluationMatrix,
        ideas: &[IdeaRecord],
    ) -> (DetailTable, SummaryTable) {
        let detail = self.detail_rows(matrix, ideas);
        let summary = self.summary_rows(matrix, ideas);

        tracing::debug!(
            detail_rows = detail.len(),
            summary_rows = summary.len(),
            "Tables generated"
        );

        (detail, summary)
    }

    /// One row per recovered dimension, in idea order, then provider
    /// insertion order, then dimension order.
    pub fn detail_rows(&self, matrix: &EvaluationMatrix, ideas: &[IdeaRecord]) -> DetailTable {
        let mut rows = Vec::new();

        for idea in ideas {
            let Some(evaluations) = matrix.get(&idea.id) else {
                continue;
            };

            for (provider, record) in evaluations.iter() {
                let Some(ratings) = record.ratings() else {
                    continue;
                };

                for (dimension, rating) in &ratings.dimensions {
                    rows.push(DetailRow {
                        idea_id: idea.id.clone(),
                        idea_title: idea.title.clone(),
                        provider: provider.to_string(),
                        dimension: *dimension,
                        score: rating.score,
                        remark: rating.remark.clone(),
                    });
                }
            }
        }

        rows
    }

    /// One row per idea, ranked by overall average.
    pub fn summary_rows(&self, matrix: &EvaluationMatrix, ideas: &[IdeaRecord]) -> SummaryTable {
        let mut rows: Vec<SummaryRow> = ideas
            .iter()
            .map(|idea| self.summarize_idea(matrix, idea))
            .collect();

        // `sort_by` is stable, so ties keep input order
        rows.sort_by(|a, b| {
            b.overall_average
                .partial_cmp(&a.overall_average)
                .unwrap_or(Ordering::Equal)
        });

        rows
    }

    fn summarize_idea(&self, matrix: &EvaluationMatrix, idea: &IdeaRecord) -> SummaryRow {
        let mut scores: BTreeMap<Dimension, Vec<i64>> =
            Dimension::ALL.into_iter().map(|d| (d, Vec::new())).collect();

        if let Some(evaluations) = matrix.get(&idea.id) {
            for ratings in evaluations.iter().filter_map(|(_, record)| record.ratings()) {
                for (dimension, rating) in &ratings.dimensions {
                    if let Some(bucket) = scores.get_mut(dimension) {
                        bucket.push(rating.score);
                    }
                }
            }
        }

        let averages: BTreeMap<Dimension, f64> = scores
            .iter()
            .map(|(dimension, values)| (*dimension, dimension_average(values)))
            .collect();

        let overall_average =
            round_one_decimal(averages.values().sum::<f64>() / averages.len() as f64);

        SummaryRow {
            idea_id: idea.id.clone(),
            idea_title: idea.title.clone(),
            averages,
            overall_average,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounded mean of the contributed scores; `0.0` when nobody contributed.
fn dimension_average(scores: &[i64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i128 = scores.iter().map(|&s| i128::from(s)).sum();
    round_one_decimal(sum as f64 / scores.len() as f64)
}

/// Round to one decimal place, ties to even on the exact binary value.
///
/// Goes through the formatter because it rounds the exact decimal
/// expansion of the `f64` (7.25 -> 7.2, 7.35 -> 7.3, 0.75 -> 0.8).
pub fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}
