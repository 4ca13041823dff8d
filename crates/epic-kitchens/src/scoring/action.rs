//! Joint verb×noun action scores.
//!
//! Verb and noun classifiers produce independent distributions. The action
//! space (`n_verbs * n_nouns`) is too large to rank densely for every
//! instance, so [`ActionScorer`] prunes both distributions to their `top_k`
//! candidates first and composes
//!
//! ```text
//! p(A = (v, n)) ∝ p(V = v) * p(N = n) * prior(v, n)
//! ```
//!
//! over the retained candidates only. The softmax is re-applied to the
//! truncated scores, so the resulting probabilities are renormalized over the
//! candidate set and are an approximation of the full joint distribution.
//!
//! # Tie-breaking
//!
//! The flattened `[top_verbs, top_nouns]` matrix is ranked with a stable
//! descending sort: equal action scores keep the higher ranked verb first,
//! then the higher ranked noun.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use super::ranking::{Scores, SparseScores, softmax_row, top_scores_row};
use crate::classes::action_id_from_verb_noun;
use crate::error::MetricsError;
use crate::utils::{Parallelism, argsort_descending};

// =============================================================================
// ActionScores
// =============================================================================

/// The `top_k` highest scoring actions of every instance.
///
/// All arrays have shape `[n_instances, top_k]`. `scores[[i, j]]` is the
/// score of action `(verbs[[i, j]], nouns[[i, j]])`, and every row is sorted
/// in descending order (`scores[[i, j]] >= scores[[i, j + 1]]`).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionScores {
    /// Original verb class ids.
    pub verbs: Array2<usize>,
    /// Original noun class ids.
    pub nouns: Array2<usize>,
    /// Composed action scores.
    pub scores: Array2<f64>,
}

impl ActionScores {
    pub fn n_instances(&self) -> usize {
        self.scores.nrows()
    }

    /// Number of actions retained per instance.
    pub fn top_k(&self) -> usize {
        self.scores.ncols()
    }

    /// Dense action ids of every retained action.
    pub fn action_ids(&self) -> Array2<usize> {
        Zip::from(&self.verbs)
            .and(&self.nouns)
            .map_collect(|&v, &n| action_id_from_verb_noun(v, n))
    }

    /// Per-instance `action id → score` mappings.
    pub fn to_sparse(&self) -> Vec<SparseScores> {
        self.action_ids()
            .rows()
            .into_iter()
            .zip(self.scores.rows())
            .map(|(ids, scores)| ids.iter().copied().zip(scores.iter().copied()).collect())
            .collect()
    }

    /// Split into `((verbs, nouns), scores)`.
    pub fn into_parts(self) -> ((Array2<usize>, Array2<usize>), Array2<f64>) {
        ((self.verbs, self.nouns), self.scores)
    }
}

impl From<&ActionScores> for Scores {
    fn from(actions: &ActionScores) -> Self {
        Scores::Sparse(actions.to_sparse())
    }
}

// =============================================================================
// ActionScorer
// =============================================================================

/// Composes verb and noun scores into a pruned action ranking.
///
/// # Example
///
/// ```
/// use epic_kitchens::ActionScorer;
/// use ndarray::array;
///
/// let verbs = array![[0.01, 0.99], [0.99, 0.1]];
/// let nouns = array![[0.1, 0.2, 0.7], [0.1, 0.2, 0.7]];
///
/// let actions = ActionScorer::new(3).score(verbs.view(), nouns.view(), None).unwrap();
/// assert_eq!(actions.verbs.row(0).to_vec(), vec![1, 1, 1]);
/// assert_eq!(actions.nouns.row(0).to_vec(), vec![2, 1, 0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionScorer {
    /// Number of verb and noun candidates kept, and of actions returned.
    pub top_k: usize,
    /// Whether instances may be scored in parallel.
    pub parallelism: Parallelism,
}

impl Default for ActionScorer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOP_K)
    }
}

/// Scored actions of a single instance.
struct RowActions {
    verbs: Array1<usize>,
    nouns: Array1<usize>,
    scores: Array1<f64>,
}

impl ActionScorer {
    pub const DEFAULT_TOP_K: usize = 100;

    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            parallelism: Parallelism::Sequential,
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Compose action scores for every instance.
    ///
    /// # Arguments
    ///
    /// * `verb_scores` - `[n_instances, n_verbs]`
    /// * `noun_scores` - `[n_instances, n_nouns]`
    /// * `action_priors` - optional `[n_verbs, n_nouns]` weights (e.g. training
    ///   co-occurrence counts). They need not sum to one; each composed score
    ///   is multiplied by the prior of its original verb/noun classes.
    ///
    /// A `top_k` larger than a class count uses every class of that task.
    ///
    /// # Errors
    ///
    /// - verb and noun scores cover a different number of instances
    /// - `action_priors` does not have shape `[n_verbs, n_nouns]`
    pub fn score(
        &self,
        verb_scores: ArrayView2<'_, f64>,
        noun_scores: ArrayView2<'_, f64>,
        action_priors: Option<ArrayView2<'_, f64>>,
    ) -> Result<ActionScores, MetricsError> {
        let (n_instances, n_verbs) = verb_scores.dim();
        let (n_noun_rows, n_nouns) = noun_scores.dim();
        if n_noun_rows != n_instances {
            return Err(MetricsError::LengthMismatch {
                what: "noun score rows",
                expected: n_instances,
                got: n_noun_rows,
            });
        }
        if let Some(priors) = action_priors {
            if priors.dim() != (n_verbs, n_nouns) {
                return Err(MetricsError::Shape {
                    what: "action_priors",
                    expected: vec![n_verbs, n_nouns],
                    got: priors.shape().to_vec(),
                });
            }
        }

        let n_top_verbs = self.top_k.min(n_verbs);
        let n_top_nouns = self.top_k.min(n_nouns);
        let width = self.top_k.min(n_top_verbs * n_top_nouns);

        let rows = self.parallelism.maybe_par_map(n_instances, |i| {
            self.score_instance(verb_scores.row(i), noun_scores.row(i), action_priors, width)
        });

        let mut actions = ActionScores {
            verbs: Array2::zeros((n_instances, width)),
            nouns: Array2::zeros((n_instances, width)),
            scores: Array2::zeros((n_instances, width)),
        };
        for (i, row) in rows.into_iter().enumerate() {
            actions.verbs.row_mut(i).assign(&row.verbs);
            actions.nouns.row_mut(i).assign(&row.nouns);
            actions.scores.row_mut(i).assign(&row.scores);
        }

        log::debug!(
            "composed {} actions per instance for {} instances from top-{} verbs and nouns",
            width,
            n_instances,
            self.top_k
        );
        Ok(actions)
    }

    fn score_instance(
        &self,
        verb_scores: ArrayView1<'_, f64>,
        noun_scores: ArrayView1<'_, f64>,
        action_priors: Option<ArrayView2<'_, f64>>,
        width: usize,
    ) -> RowActions {
        let (top_verbs, top_verb_scores) = top_scores_row(verb_scores, self.top_k);
        let (top_nouns, top_noun_scores) = top_scores_row(noun_scores, self.top_k);
        let verb_probs = softmax_row(top_verb_scores.view());
        let noun_probs = softmax_row(top_noun_scores.view());

        // shape: [n_top_verbs, n_top_nouns]
        let mut joint = &verb_probs.view().insert_axis(Axis(1))
            * &noun_probs.view().insert_axis(Axis(0));
        if let Some(priors) = action_priors {
            for ((vi, ni), p) in joint.indexed_iter_mut() {
                *p *= priors[[top_verbs[vi], top_nouns[ni]]];
            }
        }

        let n_top_nouns = top_nouns.len();
        let flat: Array1<f64> = joint.iter().copied().collect();
        let mut order = argsort_descending(flat.view());
        order.truncate(width);

        RowActions {
            verbs: order.iter().map(|&idx| top_verbs[idx / n_top_nouns]).collect(),
            nouns: order.iter().map(|&idx| top_nouns[idx % n_top_nouns]).collect(),
            scores: order.iter().map(|&idx| flat[idx]).collect(),
        }
    }
}

/// Compose the `top_k` action scores from verb and noun scores.
///
/// Shorthand for [`ActionScorer::new(top_k).score(..)`](ActionScorer::score).
pub fn compute_action_scores(
    verb_scores: ArrayView2<'_, f64>,
    noun_scores: ArrayView2<'_, f64>,
    top_k: usize,
    action_priors: Option<ArrayView2<'_, f64>>,
) -> Result<ActionScores, MetricsError> {
    ActionScorer::new(top_k).score(verb_scores, noun_scores, action_priors)
}

// =============================================================================
// Tests
// =============================================================================
