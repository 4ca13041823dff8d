//! Property-based tests for ranking, softmax, action composition and metrics.

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use epic_kitchens::{
    ActionScorer, NOUN_CLASS_COUNT, Scores, action_id_from_verb_noun, noun_id_from_action_id,
    scores_to_ranks, softmax, top_scores, topk_accuracy, verb_id_from_action_id,
};
use ndarray::{Array1, Array2};

// =============================================================================
// Strategies
// =============================================================================

/// Finite scores in a range wide enough to overflow a naive softmax.
fn arb_score() -> impl Strategy<Value = f64> {
    -500.0f64..500.0
}

/// A dense `[rows, cols]` score matrix.
fn arb_scores(max_rows: usize, max_cols: usize) -> impl Strategy<Value = Array2<f64>> {
    (1..=max_rows, 1..=max_cols).prop_flat_map(|(rows, cols)| {
        prop_vec(arb_score(), rows * cols).prop_map(move |data| {
            Array2::from_shape_vec((rows, cols), data)
                .unwrap_or_else(|_| Array2::zeros((rows, cols)))
        })
    })
}

/// Verb and noun scores covering the same instances.
fn arb_verb_noun_scores() -> impl Strategy<Value = (Array2<f64>, Array2<f64>)> {
    (1usize..6, 1usize..8, 1usize..8).prop_flat_map(|(rows, verbs, nouns)| {
        (
            prop_vec(arb_score(), rows * verbs),
            prop_vec(arb_score(), rows * nouns),
        )
            .prop_map(move |(v, n)| {
                (
                    Array2::from_shape_vec((rows, verbs), v)
                        .unwrap_or_else(|_| Array2::zeros((rows, verbs))),
                    Array2::from_shape_vec((rows, nouns), n)
                        .unwrap_or_else(|_| Array2::zeros((rows, nouns))),
                )
            })
    })
}

proptest! {
    // =========================================================================
    // Ranking
    // =========================================================================

    #[test]
    fn ranks_are_sorted_permutations(scores in arb_scores(8, 12)) {
        let ranks = scores_to_ranks(&Scores::from(scores.clone())).unwrap();
        prop_assert_eq!(ranks.dim(), scores.dim());

        for (rank_row, score_row) in ranks.rows().into_iter().zip(scores.rows()) {
            let mut seen = rank_row.to_vec();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..scores.ncols()).collect::<Vec<_>>());

            for pair in rank_row.to_vec().windows(2) {
                prop_assert!(score_row[pair[0]] >= score_row[pair[1]]);
            }
        }
    }

    #[test]
    fn top_scores_match_original_indices(scores in arb_scores(6, 10), top_k in 1usize..15) {
        let (classes, values) = top_scores(scores.view(), top_k);
        prop_assert_eq!(classes.ncols(), top_k.min(scores.ncols()));

        for i in 0..scores.nrows() {
            for j in 0..classes.ncols() {
                prop_assert_eq!(values[[i, j]], scores[[i, classes[[i, j]]]]);
                if j + 1 < classes.ncols() {
                    prop_assert!(values[[i, j]] >= values[[i, j + 1]]);
                }
            }
        }
    }

    // =========================================================================
    // Softmax
    // =========================================================================

    #[test]
    fn softmax_rows_sum_to_one(scores in arb_scores(6, 10)) {
        let p = softmax(scores.view());
        for row in p.rows() {
            prop_assert!((row.sum() - 1.0).abs() <= 1e-6);
            prop_assert!(row.iter().all(|&x| (0.0..=1.0).contains(&x)));
        }
    }

    #[test]
    fn softmax_is_shift_invariant(scores in arb_scores(4, 8), shift in -100.0f64..100.0) {
        let p = softmax(scores.view());
        let q = softmax((&scores + shift).view());
        for (a, b) in p.iter().zip(q.iter()) {
            prop_assert!((a - b).abs() <= 1e-6);
        }
    }

    // =========================================================================
    // Action ids
    // =========================================================================

    #[test]
    fn action_ids_round_trip(verb in 0usize..1000, noun in 0usize..NOUN_CLASS_COUNT) {
        let id = action_id_from_verb_noun(verb, noun);
        prop_assert_eq!(verb_id_from_action_id(id), verb);
        prop_assert_eq!(noun_id_from_action_id(id), noun);
    }

    // =========================================================================
    // Action composition
    // =========================================================================

    #[test]
    fn composed_actions_are_valid_and_descending(
        (verbs, nouns) in arb_verb_noun_scores(),
        top_k in 1usize..10,
    ) {
        let actions = ActionScorer::new(top_k).score(verbs.view(), nouns.view(), None).unwrap();
        let width = top_k.min(top_k.min(verbs.ncols()) * top_k.min(nouns.ncols()));
        prop_assert_eq!(actions.scores.dim(), (verbs.nrows(), width));

        for i in 0..actions.n_instances() {
            for j in 0..width {
                prop_assert!(actions.verbs[[i, j]] < verbs.ncols());
                prop_assert!(actions.nouns[[i, j]] < nouns.ncols());
                if j + 1 < width {
                    prop_assert!(actions.scores[[i, j]] >= actions.scores[[i, j + 1]]);
                }
            }
        }
    }

    #[test]
    fn composed_actions_are_distinct(
        (verbs, nouns) in arb_verb_noun_scores(),
        top_k in 1usize..10,
    ) {
        let actions = ActionScorer::new(top_k).score(verbs.view(), nouns.view(), None).unwrap();
        for row in actions.action_ids().rows() {
            let mut ids = row.to_vec();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), row.len());
        }
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    #[test]
    fn topk_accuracy_is_monotone_in_k(
        scores in arb_scores(10, 8),
        seed_labels in prop_vec(0usize..8, 10),
    ) {
        let ranks = scores_to_ranks(&Scores::from(scores.clone())).unwrap();
        let labels: Array1<usize> = seed_labels
            .iter()
            .take(scores.nrows())
            .map(|&l| l % scores.ncols())
            .collect();
        let ks: Vec<usize> = (1..=scores.ncols() + 1).collect();
        let accuracies = topk_accuracy(ranks.view(), labels.view(), &ks).unwrap();

        for pair in accuracies.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        prop_assert_eq!(*accuracies.last().unwrap_or(&0.0), 1.0);
    }
}
