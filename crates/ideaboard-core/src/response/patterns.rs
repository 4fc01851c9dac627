//! Regex patterns used to salvage ratings from provider text.
//!
//! Two families per dimension:
//! - **keyed**: the JSON key survives but the document does not decode
//!   (`"novelty" ... "score" ... 8`)
//! - **labelled**: plain prose with a natural-language label
//!   (`Technical Complexity: 7/10`)

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::types::Dimension;

/// Patterns for one dimension.
pub struct DimensionPatterns {
    /// `"<key>" ... "score" ... <digits>`, case-insensitive, dot-all
    pub keyed_score: Regex,

    /// `"<key>" ... "remark" ... "<text>"`, case-insensitive, dot-all
    pub keyed_remark: Regex,

    /// `<label words> [:-] <1-2 digits> [/10]`, case-insensitive
    pub labelled_score: Regex,
}

impl DimensionPatterns {
    fn for_dimension(dimension: Dimension) -> Self {
        let key = regex::escape(dimension.key());
        let label = dimension
            .key()
            .split('_')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"[\s_-]+");

        Self {
            keyed_score: Regex::new(&format!(r#"(?is)"{key}".*?"score".*?(\d+)"#)).unwrap(),
            keyed_remark: Regex::new(&format!(r#"(?is)"{key}".*?"remark".*?"([^"]+)""#))
                .unwrap(),
            labelled_score: Regex::new(&format!(
                r"(?i)\b{label}\b[*\s:\-]+(\d{{1,2}})\b(?:\s*/\s*10)?"
            ))
            .unwrap(),
        }
    }
}

lazy_static! {
    /// Per-dimension salvage patterns, compiled once.
    pub static ref DIMENSION_PATTERNS: HashMap<Dimension, DimensionPatterns> = Dimension::ALL
        .into_iter()
        .map(|d| (d, DimensionPatterns::for_dimension(d)))
        .collect();

    /// End of a prose remark: a blank line, or a line starting with a
    /// capital letter (after optional bullet / emphasis markers).
    pub static ref REMARK_BREAK: Regex = Regex::new(
        r"\n[ \t]*\n|\n[ \t*#>\-]*[A-Z]"
    ).unwrap();
}

/// Patterns for a dimension.
pub fn patterns(dimension: Dimension) -> &'static DimensionPatterns {
    &DIMENSION_PATTERNS[&dimension]
}

const SEPARATORS: [char; 5] = [':', '-', '*', ' ', '\t'];

/// Prose remark following a labelled score that ends at byte `from`.
///
/// The remark ends at the next blank line or capitalized line start, so a
/// capitalized line directly after the score leaves it empty. Returns `None`
/// when nothing follows, or when what follows is another dimension's score.
pub fn trailing_remark(text: &str, from: usize) -> Option<String> {
    let rest = text[from..].trim_start_matches(SEPARATORS);
    let end = REMARK_BREAK.find(rest).map_or(rest.len(), |m| m.start());
    let remark = rest[..end].trim();

    let starts_new_rating = DIMENSION_PATTERNS
        .values()
        .any(|p| p.labelled_score.find(remark).is_some_and(|m| m.start() == 0));

    if remark.is_empty() || starts_new_rating {
        None
    } else {
        Some(remark.to_string())
    }
}
