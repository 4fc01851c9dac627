//! # ideaboard-core
//!
//! Deterministic half of the idea evaluator: the data model, the
//! multi-tier response parser and the aggregator.
//!
//! ## Key Guarantees
//!
//! 1. **No provider calls**: everything here is pure and synchronous
//! 2. **Total parsing**: any text becomes an [`EvaluationRecord`], never an error
//! 3. **Failures are data**: error sentinels flow through to the matrix
//!    and are excluded from averages rather than counted as zero
//!
//! ## Example
//!
//! ```rust
//! use ideaboard_core::{parse_response, Aggregator, EvaluationMatrix, IdeaEvaluations, IdeaRecord};
//!
//! let idea = IdeaRecord::new("E1", "Energy Coach", "Schedules appliances around grid prices");
//! let record = parse_response("Novelty: 8/10 - fresh\nFeasibility: 6/10");
//!
//! let mut evaluations = IdeaEvaluations::new();
//! evaluations.insert("Mock-LLM-1", record);
//!
//! let mut matrix = EvaluationMatrix::new();
//! matrix.insert("E1", evaluations);
//!
//! let (detail, summary) = Aggregator::new().aggregate(&matrix, &[idea]);
//! assert_eq!(detail.len(), 2);
//! assert_eq!(summary[0].idea_id, "E1");
//! ```

pub mod aggregator;
pub mod ideas;
pub mod response;
pub mod types;

// Re-export main types at crate root
pub use aggregator::{
    round_one_decimal, Aggregator, DetailRow, DetailTable, SummaryRow, SummaryTable,
};
pub use ideas::{extract_ideas, load_ideas, IdeaSourceError};
pub use response::{parse_response, ExtractionStrategy, ResponseParser};
pub use types::{
    Dimension, DimensionRating, EvaluationFailure, EvaluationMatrix, EvaluationRecord,
    IdeaEvaluations, IdeaRecord, Ratings, NO_REMARK, UNPARSEABLE_RESPONSE,
};
