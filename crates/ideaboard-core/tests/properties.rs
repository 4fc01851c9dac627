use ideaboard_core::{
    parse_response, Aggregator, Dimension, DimensionRating, EvaluationMatrix, EvaluationRecord,
    IdeaEvaluations, IdeaRecord, Ratings, UNPARSEABLE_RESPONSE,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn full_document(entries: &[(i64, String)]) -> String {
    let mut document = Map::new();
    for (dimension, (score, remark)) in Dimension::ALL.into_iter().zip(entries) {
        document.insert(
            dimension.key().to_string(),
            json!({ "score": score, "remark": remark }),
        );
    }
    document.insert("overall_impression".to_string(), json!("n/a"));
    Value::Object(document).to_string()
}

/// Per provider: `None` is a provider failure, otherwise the (dimension
/// index, score) pairs it returned.
type ProviderRow = Option<Vec<(usize, i64)>>;

fn record_from(row: &ProviderRow) -> EvaluationRecord {
    match row {
        None => EvaluationRecord::provider_failure("provider raised"),
        Some(pairs) => EvaluationRecord::Rated(
            pairs
                .iter()
                .map(|&(index, score)| (Dimension::ALL[index], DimensionRating::new(score, "r")))
                .collect::<Ratings>(),
        ),
    }
}

fn build_matrix(grid: &[Vec<ProviderRow>]) -> (EvaluationMatrix, Vec<IdeaRecord>) {
    let mut matrix = EvaluationMatrix::new();
    let mut ideas = Vec::new();

    for (i, providers) in grid.iter().enumerate() {
        let id = format!("I{i}");
        let evaluations: IdeaEvaluations = providers
            .iter()
            .enumerate()
            .map(|(p, row)| (format!("P{p}"), record_from(row)))
            .collect();
        matrix.insert(id.clone(), evaluations);
        ideas.push(IdeaRecord::new(id, "title", "description"));
    }

    (matrix, ideas)
}

fn provider_row() -> impl Strategy<Value = ProviderRow> {
    prop::option::weighted(0.8, prop::collection::vec((0usize..7, 1i64..=10), 0..10))
}

fn grid() -> impl Strategy<Value = Vec<Vec<ProviderRow>>> {
    prop::collection::vec(prop::collection::vec(provider_row(), 0..5), 1..6)
}

proptest! {
    #[test]
    fn test_full_json_round_trips(entries in prop::collection::vec((-100i64..100, "\\PC{0,40}"), 7)) {
        let record = parse_response(&full_document(&entries));
        let ratings = record.ratings().expect("ratings");

        prop_assert_eq!(ratings.len(), 7);
        for (dimension, (score, remark)) in Dimension::ALL.into_iter().zip(&entries) {
            prop_assert_eq!(
                ratings.get(dimension).cloned(),
                Some(DimensionRating::new(*score, remark.clone()))
            );
        }
    }

    #[test]
    fn test_embedded_json_matches_bare(
        entries in prop::collection::vec((1i64..=10, "[a-zA-Z ,.]{0,30}"), 7),
        prefix in "[a-zA-Z0-9 .,:!\n]{0,60}",
        suffix in "[a-zA-Z0-9 .,:!\n]{0,60}",
    ) {
        let bare = full_document(&entries);
        let wrapped = format!("{prefix}{bare}{suffix}");
        prop_assert_eq!(parse_response(&wrapped), parse_response(&bare));
    }

    #[test]
    fn test_unstructured_text_returns_sentinel(raw in "[a-z .,!?\n]{0,120}") {
        let record = parse_response(&raw);
        let failure = record.failure().expect("sentinel");

        prop_assert_eq!(failure.error.as_str(), UNPARSEABLE_RESPONSE);
        prop_assert_eq!(failure.raw_response.as_deref(), Some(raw.as_str()));
    }

    #[test]
    fn test_detail_row_count_matches_recovered_dimensions(grid in grid()) {
        let (matrix, ideas) = build_matrix(&grid);
        let (detail, _) = Aggregator::new().aggregate(&matrix, &ideas);

        let expected: usize = matrix
            .iter()
            .flat_map(|(_, evaluations)| evaluations.iter())
            .filter_map(|(_, record)| record.ratings())
            .map(|ratings| ratings.len())
            .sum();
        prop_assert_eq!(detail.len(), expected);
    }

    #[test]
    fn test_summary_sorted_and_stable(grid in grid()) {
        let (matrix, ideas) = build_matrix(&grid);
        let (_, summary) = Aggregator::new().aggregate(&matrix, &ideas);

        prop_assert_eq!(summary.len(), ideas.len());
        let position = |id: &str| ideas.iter().position(|idea| idea.id == id);
        for pair in summary.windows(2) {
            prop_assert!(pair[0].overall_average >= pair[1].overall_average);
            if pair[0].overall_average == pair[1].overall_average {
                prop_assert!(position(&pair[0].idea_id) < position(&pair[1].idea_id));
            }
        }
    }

    #[test]
    fn test_failing_provider_does_not_dilute(score in 1i64..=10) {
        let row: ProviderRow = Some((0..7).map(|i| (i, score)).collect());
        let (matrix, ideas) = build_matrix(&[vec![row, None]]);
        let (_, summary) = Aggregator::new().aggregate(&matrix, &ideas);

        for dimension in Dimension::ALL {
            prop_assert_eq!(summary[0].average(dimension), score as f64);
        }
        prop_assert_eq!(summary[0].overall_average, score as f64);
    }
}

#[test]
fn test_unrated_dimension_counts_as_zero() {
    // Every dimension but trend alignment at 7: 42 / 7 = 6.0
    let row: ProviderRow = Some((0..6).map(|i| (i, 7)).collect());
    let (matrix, ideas) = build_matrix(&[vec![row]]);
    let (_, summary) = Aggregator::new().aggregate(&matrix, &ideas);

    assert_eq!(summary[0].average(Dimension::TrendAlignment), 0.0);
    assert_eq!(summary[0].overall_average, 6.0);
}
