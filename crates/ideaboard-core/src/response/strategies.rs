//! The ordered extraction tiers.
//!
//! Every strategy is total: it never panics or errors, it only reports
//! which of the wanted dimensions it could recover.

use serde_json::{Map, Value};

use super::patterns::{patterns, trailing_remark};
use crate::types::{Dimension, DimensionRating, Ratings, NO_REMARK};

/// What a strategy gets to look at.
pub struct ExtractionContext<'a> {
    /// The provider's text, verbatim
    pub raw: &'a str,

    /// The JSON object decoded from `raw`, if any
    pub document: Option<&'a Map<String, Value>>,
}

/// One tier of the fallback cascade.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this tier runs at all for the given input.
    fn applies(&self, _ctx: &ExtractionContext<'_>) -> bool {
        true
    }

    /// Recover as many of `wanted` as possible. `None` when nothing was found.
    fn extract(&self, ctx: &ExtractionContext<'_>, wanted: &[Dimension]) -> Option<Ratings>;
}

/// Decode the whole text as a JSON object, or failing that the span from
/// the first `{` to the last `}`.
pub fn locate_document(raw: &str) -> Option<Map<String, Value>> {
    decode_object(raw).or_else(|| {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if end <= start {
            return None;
        }
        decode_object(&raw[start..=end])
    })
}

fn decode_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// A `{"score": .., "remark": ..}` entry. Scores must be integral numbers;
/// anything else is left for the later tiers.
fn rating_from_value(value: &Value) -> Option<DimensionRating> {
    let entry = value.as_object()?;
    let score = match entry.get("score")? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })?,
        _ => return None,
    };
    let remark = match entry.get("remark") {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => NO_REMARK.to_string(),
        Some(other) => other.to_string(),
    };
    Some(DimensionRating::new(score, remark))
}

fn non_empty(ratings: Ratings) -> Option<Ratings> {
    if ratings.is_empty() && ratings.overall_impression.is_none() {
        None
    } else {
        Some(ratings)
    }
}

/// Tier 1: read dimensions straight out of the decoded JSON object.
pub struct StrictJson;

impl ExtractionStrategy for StrictJson {
    fn name(&self) -> &'static str {
        "strict_json"
    }

    fn applies(&self, ctx: &ExtractionContext<'_>) -> bool {
        ctx.document.is_some()
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, wanted: &[Dimension]) -> Option<Ratings> {
        let document = ctx.document?;

        let mut ratings: Ratings = wanted
            .iter()
            .filter_map(|&d| document.get(d.key()).and_then(rating_from_value).map(|r| (d, r)))
            .collect();
        ratings.overall_impression = document
            .get("overall_impression")
            .and_then(Value::as_str)
            .map(str::to_string);

        non_empty(ratings)
    }
}

/// Tier 2: regex salvage of `"<key>" ... "score" ... N` pairs, for text
/// whose keys survived but whose structure did not.
pub struct KeyRepair;

impl ExtractionStrategy for KeyRepair {
    fn name(&self) -> &'static str {
        "key_repair"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, wanted: &[Dimension]) -> Option<Ratings> {
        let ratings: Ratings = wanted
            .iter()
            .filter_map(|&dimension| {
                let patterns = patterns(dimension);
                let score = patterns
                    .keyed_score
                    .captures(ctx.raw)?
                    .get(1)?
                    .as_str()
                    .parse::<i64>()
                    .ok()?;
                let remark = patterns
                    .keyed_remark
                    .captures(ctx.raw)
                    .and_then(|c| c.get(1))
                    .map_or_else(|| NO_REMARK.to_string(), |m| m.as_str().to_string());
                Some((dimension, DimensionRating::new(score, remark)))
            })
            .collect();

        non_empty(ratings)
    }
}

/// Tier 3: prose such as `Market Viability: 7/10 - crowded space`.
/// Only runs when no JSON object could be decoded at all.
pub struct FreeText;

impl ExtractionStrategy for FreeText {
    fn name(&self) -> &'static str {
        "free_text"
    }

    fn applies(&self, ctx: &ExtractionContext<'_>) -> bool {
        ctx.document.is_none()
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, wanted: &[Dimension]) -> Option<Ratings> {
        let ratings: Ratings = wanted
            .iter()
            .filter_map(|&dimension| {
                let captures = patterns(dimension).labelled_score.captures(ctx.raw)?;
                let score = captures.get(1)?.as_str().parse::<i64>().ok()?;
                let end = captures.get(0)?.end();
                let remark =
                    trailing_remark(ctx.raw, end).unwrap_or_else(|| NO_REMARK.to_string());
                Some((dimension, DimensionRating::new(score, remark)))
            })
            .collect();

        non_empty(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(raw: &'a str, document: Option<&'a Map<String, Value>>) -> ExtractionContext<'a> {
        ExtractionContext { raw, document }
    }

    #[test]
    fn test_locate_document_whole_text() {
        let doc = locate_document(r#"  {"novelty": {"score": 3, "remark": "meh"}}  "#).unwrap();
        assert!(doc.contains_key("novelty"));
    }

    #[test]
    fn test_locate_document_embedded() {
        let raw = "Sure! Here it is:\n{\"feasibility\": {\"score\": 6}}\nHope that helps.";
        let doc = locate_document(raw).unwrap();
        assert!(doc.contains_key("feasibility"));
    }

    #[test]
    fn test_locate_document_rejects_non_objects() {
        assert!(locate_document("[1, 2, 3]").is_none());
        assert!(locate_document("} backwards {").is_none());
        assert!(locate_document("{not json}").is_none());
    }

    #[test]
    fn test_strict_json_accepts_integral_floats_only() {
        let doc = locate_document(
            r#"{"novelty": {"score": 8.0, "remark": "x"}, "feasibility": {"score": 7.5, "remark": "y"}, "impact_potential": {"score": "9"}}"#,
        )
        .unwrap();
        let ratings = StrictJson
            .extract(&context("", Some(&doc)), &Dimension::ALL)
            .unwrap();

        assert_eq!(ratings.get(Dimension::Novelty).unwrap().score, 8);
        assert!(!ratings.contains(Dimension::Feasibility));
        assert!(!ratings.contains(Dimension::ImpactPotential));
    }

    #[test]
    fn test_strict_json_remark_fallbacks() {
        let doc = locate_document(
            r#"{"novelty": {"score": 4}, "trend_alignment": {"score": 5, "remark": ["a", "b"]}}"#,
        )
        .unwrap();
        let ratings = StrictJson
            .extract(&context("", Some(&doc)), &Dimension::ALL)
            .unwrap();

        assert_eq!(ratings.get(Dimension::Novelty).unwrap().remark, NO_REMARK);
        assert_eq!(ratings.get(Dimension::TrendAlignment).unwrap().remark, r#"["a","b"]"#);
    }

    #[test]
    fn test_strict_json_only_fills_wanted() {
        let doc = locate_document(r#"{"novelty": {"score": 4}, "feasibility": {"score": 2}}"#).unwrap();
        let ratings = StrictJson
            .extract(&context("", Some(&doc)), &[Dimension::Feasibility])
            .unwrap();
        assert_eq!(ratings.len(), 1);
        assert!(ratings.contains(Dimension::Feasibility));
    }

    #[test]
    fn test_key_repair_recovers_from_broken_json() {
        let raw = r#"{"Novelty": {"score": 9, "remark": "Bold"}, "feasibility": {"score": 3, }"#;
        let ratings = KeyRepair
            .extract(&context(raw, None), &[Dimension::Novelty, Dimension::Feasibility])
            .unwrap();

        assert_eq!(ratings.get(Dimension::Novelty).unwrap(), &DimensionRating::new(9, "Bold"));
        assert_eq!(ratings.get(Dimension::Feasibility).unwrap().score, 3);
        assert_eq!(ratings.get(Dimension::Feasibility).unwrap().remark, NO_REMARK);
    }

    #[test]
    fn test_free_text_skipped_when_document_present() {
        let doc = Map::new();
        assert!(!FreeText.applies(&context("Novelty: 8", Some(&doc))));
        assert!(FreeText.applies(&context("Novelty: 8", None)));
    }

    #[test]
    fn test_free_text_extracts_prose() {
        let raw = "Novelty: 8/10 - Original angle\nFeasibility - 5\n\nOverall fine.";
        let ratings = FreeText.extract(&context(raw, None), &Dimension::ALL).unwrap();

        assert_eq!(
            ratings.get(Dimension::Novelty).unwrap(),
            &DimensionRating::new(8, "Original angle")
        );
        assert_eq!(
            ratings.get(Dimension::Feasibility).unwrap(),
            &DimensionRating::new(5, NO_REMARK)
        );
        assert_eq!(ratings.len(), 2);
    }

    #[test]
    fn test_strategies_return_none_when_nothing_found() {
        let raw = "no structure here";
        assert!(KeyRepair.extract(&context(raw, None), &Dimension::ALL).is_none());
        assert!(FreeText.extract(&context(raw, None), &Dimension::ALL).is_none());
    }
}
