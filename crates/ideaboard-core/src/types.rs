//! Shared data model: ideas, rating dimensions, evaluation records and the
//! idea × provider evaluation matrix.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Remark stored when a provider gave a score but no usable remark.
pub const NO_REMARK: &str = "No remark provided";

/// Error text stored when no dimension could be recovered from a response.
pub const UNPARSEABLE_RESPONSE: &str = "unparseable response";

/// One candidate proposal under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRecord {
    /// Caller-assigned identifier, unique within a run (e.g. "E1")
    pub id: String,

    /// Short project title
    pub title: String,

    /// Free-text description handed to the providers
    pub description: String,
}

impl IdeaRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for IdeaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n{}", self.id, self.title, self.description)
    }
}

/// The seven fixed rubric axes.
///
/// Declaration order is the display order and the iteration order of every
/// `BTreeMap<Dimension, _>` in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Novelty,
    TechnicalComplexity,
    ImpactPotential,
    MarketViability,
    Feasibility,
    UserDesirability,
    TrendAlignment,
}

impl Dimension {
    /// All dimensions in display order.
    pub const ALL: [Dimension; 7] = [
        Dimension::Novelty,
        Dimension::TechnicalComplexity,
        Dimension::ImpactPotential,
        Dimension::MarketViability,
        Dimension::Feasibility,
        Dimension::UserDesirability,
        Dimension::TrendAlignment,
    ];

    /// Machine key used in the JSON output contract (`technical_complexity`).
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Novelty => "novelty",
            Dimension::TechnicalComplexity => "technical_complexity",
            Dimension::ImpactPotential => "impact_potential",
            Dimension::MarketViability => "market_viability",
            Dimension::Feasibility => "feasibility",
            Dimension::UserDesirability => "user_desirability",
            Dimension::TrendAlignment => "trend_alignment",
        }
    }

    /// Human-readable label (`Technical Complexity`).
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Novelty => "Novelty",
            Dimension::TechnicalComplexity => "Technical Complexity",
            Dimension::ImpactPotential => "Impact Potential",
            Dimension::MarketViability => "Market Viability",
            Dimension::Feasibility => "Feasibility",
            Dimension::UserDesirability => "User Desirability",
            Dimension::TrendAlignment => "Trend Alignment",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single score with its remark.
///
/// The prompt asks for `1..=10`, but the score is stored exactly as the
/// provider returned it. Range is never checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRating {
    pub score: i64,
    pub remark: String,
}

impl DimensionRating {
    pub fn new(score: i64, remark: impl Into<String>) -> Self {
        Self {
            score,
            remark: remark.into(),
        }
    }
}

/// Dimensions recovered from one provider response.
///
/// May be partial: absent dimensions simply did not contribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ratings {
    #[serde(flatten)]
    pub dimensions: BTreeMap<Dimension, DimensionRating>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_impression: Option<String>,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: Dimension) -> Option<&DimensionRating> {
        self.dimensions.get(&dimension)
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.dimensions.contains_key(&dimension)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// True when all seven dimensions are present.
    pub fn is_complete(&self) -> bool {
        self.dimensions.len() == Dimension::ALL.len()
    }

    /// Dimensions not yet recovered, in display order.
    pub fn missing(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| !self.dimensions.contains_key(d))
            .collect()
    }

    /// Insert only if the dimension is still absent. Returns whether it was inserted.
    pub fn fill(&mut self, dimension: Dimension, rating: DimensionRating) -> bool {
        if self.dimensions.contains_key(&dimension) {
            return false;
        }
        self.dimensions.insert(dimension, rating);
        true
    }
}

impl FromIterator<(Dimension, DimensionRating)> for Ratings {
    fn from_iter<T: IntoIterator<Item = (Dimension, DimensionRating)>>(iter: T) -> Self {
        Self {
            dimensions: iter.into_iter().collect(),
            overall_impression: None,
        }
    }
}

/// Sentinel recorded instead of ratings when a provider call or parse failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationFailure {
    pub error: String,

    /// The raw provider text, present only for parse failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Result of one provider rating one idea.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationRecord {
    Rated(Ratings),
    Failed(EvaluationFailure),
}

impl EvaluationRecord {
    /// Sentinel for a provider that raised instead of returning text.
    pub fn provider_failure(message: impl Into<String>) -> Self {
        EvaluationRecord::Failed(EvaluationFailure {
            error: message.into(),
            raw_response: None,
        })
    }

    /// Sentinel for text from which no dimension could be recovered.
    pub fn unparseable(raw: impl Into<String>) -> Self {
        EvaluationRecord::Failed(EvaluationFailure {
            error: UNPARSEABLE_RESPONSE.to_string(),
            raw_response: Some(raw.into()),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvaluationRecord::Failed(_))
    }

    /// Ratings, or `None` for an error sentinel.
    pub fn ratings(&self) -> Option<&Ratings> {
        match self {
            EvaluationRecord::Rated(ratings) => Some(ratings),
            EvaluationRecord::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EvaluationFailure> {
        match self {
            EvaluationRecord::Failed(failure) => Some(failure),
            EvaluationRecord::Rated(_) => None,
        }
    }
}

/// Records for one idea, keyed by provider name in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaEvaluations {
    entries: Vec<(String, EvaluationRecord)>,
}

impl IdeaEvaluations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a provider's result. A repeated provider name replaces the
    /// earlier record in place.
    pub fn insert(&mut self, provider: impl Into<String>, record: EvaluationRecord) {
        let provider = provider.into();
        match self.entries.iter_mut().find(|(name, _)| *name == provider) {
            Some(slot) => slot.1 = record,
            None => self.entries.push((provider, record)),
        }
    }

    pub fn get(&self, provider: &str) -> Option<&EvaluationRecord> {
        self.entries
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvaluationRecord)> {
        self.entries.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of providers whose record is not an error sentinel.
    pub fn successful(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, record)| !record.is_error())
            .map(|(name, _)| name)
            .collect()
    }

    /// Names of providers whose record is an error sentinel.
    pub fn failed(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, record)| record.is_error())
            .map(|(name, _)| name)
            .collect()
    }
}

impl FromIterator<(String, EvaluationRecord)> for IdeaEvaluations {
    fn from_iter<T: IntoIterator<Item = (String, EvaluationRecord)>>(iter: T) -> Self {
        let mut evaluations = Self::new();
        for (name, record) in iter {
            evaluations.insert(name, record);
        }
        evaluations
    }
}

impl Serialize for IdeaEvaluations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

/// The complete idea × provider grid for a run, keyed by idea id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationMatrix {
    ideas: BTreeMap<String, IdeaEvaluations>,
}

impl EvaluationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, idea_id: impl Into<String>, evaluations: IdeaEvaluations) {
        self.ideas.insert(idea_id.into(), evaluations);
    }

    pub fn get(&self, idea_id: &str) -> Option<&IdeaEvaluations> {
        self.ideas.get(idea_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IdeaEvaluations)> {
        self.ideas.iter().map(|(id, evals)| (id.as_str(), evals))
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}
