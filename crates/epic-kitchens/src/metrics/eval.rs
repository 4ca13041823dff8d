//! Full evaluation pipeline.

use std::collections::BTreeSet;

use ndarray::{ArrayView1, ArrayView2};

use super::MetricsResult;
use super::config::MetricsConfig;
use super::groundtruth::GroundTruth;
use super::tasks::{TaskRanks, compute_class_agnostic_metrics, compute_class_aware_metrics};
use crate::classes::{ManyShotClasses, NOUN_CLASS_COUNT, checked_action_id};
use crate::error::MetricsError;
use crate::scoring::{Scores, Task, TaskScores, scores_to_ranks};

/// Computes [`MetricsResult`]s with a fixed [`MetricsConfig`].
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
///
/// use epic_kitchens::{Evaluator, GroundTruth, ManyShotClasses, MetricsConfig, Scores, Task};
/// use ndarray::array;
///
/// let groundtruth = GroundTruth::new(array![1, 0, 1], array![0, 2, 1]).unwrap();
/// let mut scores = BTreeMap::new();
/// scores.insert(Task::Verb, Scores::from(array![[0.1, 0.9], [0.6, 0.4], [0.3, 0.7]]));
/// scores.insert(
///     Task::Noun,
///     Scores::from(array![[0.8, 0.1, 0.1], [0.2, 0.2, 0.6], [0.5, 0.3, 0.2]]),
/// );
///
/// let config = MetricsConfig::builder().ks(vec![1, 2]).build().unwrap();
/// let metrics = Evaluator::new(config)
///     .evaluate(&groundtruth, &scores, &ManyShotClasses::default(), None)
///     .unwrap();
/// assert_eq!(metrics.accuracy.verb, vec![1.0, 1.0]);
/// assert_eq!(metrics.accuracy.noun.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: MetricsConfig,
}

impl Evaluator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Evaluate `scores` against `groundtruth`.
    ///
    /// `scores` must hold verb and noun scores; action scores are derived
    /// from them with [`MetricsConfig::action_scorer`] when absent, weighted
    /// by `action_priors` if given. Every score collection must have one row
    /// per ground-truth instance.
    ///
    /// Unspecified many-shot sets fall back to every class present in the
    /// ground truth.
    ///
    /// # Errors
    ///
    /// - verb or noun scores missing
    /// - a score collection with a different number of instances than `groundtruth`
    /// - dense scores that are not 2D, or ragged sparse scores
    /// - `action_priors` of the wrong shape when action scores are derived
    pub fn evaluate(
        &self,
        groundtruth: &GroundTruth,
        scores: &TaskScores,
        many_shot: &ManyShotClasses,
        action_priors: Option<ArrayView2<'_, f64>>,
    ) -> Result<MetricsResult, MetricsError> {
        let verb_scores = required_scores(scores, Task::Verb)?;
        let noun_scores = required_scores(scores, Task::Noun)?;
        check_instances(groundtruth, verb_scores, "verb scores")?;
        check_instances(groundtruth, noun_scores, "noun scores")?;

        let derived;
        let action_scores = match scores.get(&Task::Action) {
            Some(action_scores) => action_scores,
            None => {
                derived = self.derive_action_scores(verb_scores, noun_scores, action_priors)?;
                &derived
            }
        };
        check_instances(groundtruth, action_scores, "action scores")?;

        let mut ranks = TaskRanks::new();
        ranks.insert(Task::Verb, scores_to_ranks(verb_scores)?);
        ranks.insert(Task::Noun, scores_to_ranks(noun_scores)?);
        ranks.insert(Task::Action, scores_to_ranks(action_scores)?);

        let action_class = groundtruth.action_class();
        let many_shot_verbs =
            many_shot_or_present(many_shot.verbs.as_ref(), groundtruth.verb_class());
        let many_shot_nouns =
            many_shot_or_present(many_shot.nouns.as_ref(), groundtruth.noun_class());
        // Pairs without an action id cannot occur in the ground truth.
        let many_shot_actions: Vec<usize> = match &many_shot.actions {
            Some(actions) => actions
                .iter()
                .filter_map(|a| checked_action_id(a.verb_class, a.noun_class))
                .collect(),
            None => distinct(action_class.view()),
        };

        let accuracy = compute_class_aware_metrics(
            groundtruth,
            &ranks,
            &self.config.ks,
            &self.config.action_ks,
        )?;
        let agnostic = compute_class_agnostic_metrics(
            groundtruth,
            &ranks,
            &many_shot_verbs,
            &many_shot_nouns,
            &many_shot_actions,
        )?;

        Ok(MetricsResult {
            accuracy,
            precision: agnostic.precision,
            recall: agnostic.recall,
        })
    }

    fn derive_action_scores(
        &self,
        verb_scores: &Scores,
        noun_scores: &Scores,
        action_priors: Option<ArrayView2<'_, f64>>,
    ) -> Result<Scores, MetricsError> {
        let verbs = verb_scores.dense_2d("verb scores")?;
        let nouns = noun_scores.dense_2d("noun scores")?;
        if nouns.ncols() > NOUN_CLASS_COUNT {
            return Err(MetricsError::InvalidParameter {
                name: "noun scores",
                reason: format!(
                    "{} noun classes cannot be encoded as action ids (at most {NOUN_CLASS_COUNT})",
                    nouns.ncols()
                ),
            });
        }

        log::debug!("no action scores provided, deriving them from verb and noun scores");
        let actions = self.config.action_scorer().score(verbs, nouns, action_priors)?;
        Ok(Scores::from(&actions))
    }
}

/// Evaluate with the default [`MetricsConfig`].
///
/// See [`Evaluator::evaluate`].
pub fn compute_metrics(
    groundtruth: &GroundTruth,
    scores: &TaskScores,
    many_shot: &ManyShotClasses,
    action_priors: Option<ArrayView2<'_, f64>>,
) -> Result<MetricsResult, MetricsError> {
    Evaluator::default().evaluate(groundtruth, scores, many_shot, action_priors)
}

fn required_scores(scores: &TaskScores, task: Task) -> Result<&Scores, MetricsError> {
    scores
        .get(&task)
        .ok_or_else(|| MetricsError::MissingScores(task.to_string()))
}

fn check_instances(
    groundtruth: &GroundTruth,
    scores: &Scores,
    what: &'static str,
) -> Result<(), MetricsError> {
    if scores.n_instances() != groundtruth.len() {
        return Err(MetricsError::LengthMismatch {
            what,
            expected: groundtruth.len(),
            got: scores.n_instances(),
        });
    }
    Ok(())
}

fn distinct(labels: ArrayView1<'_, usize>) -> Vec<usize> {
    labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn many_shot_or_present(
    many_shot: Option<&BTreeSet<usize>>,
    labels: ArrayView1<'_, usize>,
) -> Vec<usize> {
    match many_shot {
        Some(classes) => classes.iter().copied().collect(),
        None => distinct(labels),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ActionClass;
    use crate::scoring::SparseScores;
    use crate::testing::DEFAULT_TOLERANCE;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    fn groundtruth() -> GroundTruth {
        GroundTruth::new(array![0, 1, 0, 1], array![0, 1, 1, 0]).unwrap()
    }

    fn task_scores() -> TaskScores {
        let mut scores = TaskScores::new();
        scores.insert(
            Task::Verb,
            Scores::from(array![[0.9, 0.1], [0.7, 0.3], [0.8, 0.2], [0.2, 0.8]]),
        );
        scores.insert(
            Task::Noun,
            Scores::from(array![[0.9, 0.1], [0.1, 0.9], [0.6, 0.4], [0.3, 0.7]]),
        );
        scores
    }

    #[test]
    fn missing_verb_scores() {
        let mut scores = task_scores();
        scores.remove(&Task::Verb);
        let err = compute_metrics(&groundtruth(), &scores, &ManyShotClasses::default(), None)
            .unwrap_err();
        assert_eq!(err, MetricsError::MissingScores("verb".to_string()));
        assert_eq!(err.to_string(), "verb scores must be provided");
    }

    #[test]
    fn length_mismatch_with_groundtruth() {
        let mut scores = task_scores();
        scores.insert(Task::Noun, Scores::from(Array2::<f64>::zeros((3, 2))));
        let err = compute_metrics(&groundtruth(), &scores, &ManyShotClasses::default(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::LengthMismatch { what: "noun scores", expected: 4, got: 3 }
        ));
    }

    #[test]
    fn derived_actions_match_explicit_actions() {
        let gt = groundtruth();
        let scores = task_scores();
        let derived = compute_metrics(&gt, &scores, &ManyShotClasses::default(), None).unwrap();

        let actions = crate::scoring::compute_action_scores(
            scores[&Task::Verb].dense_2d("verb").unwrap(),
            scores[&Task::Noun].dense_2d("noun").unwrap(),
            100,
            None,
        )
        .unwrap();
        let mut explicit_scores = scores.clone();
        explicit_scores.insert(Task::Action, Scores::from(&actions));
        let explicit =
            compute_metrics(&gt, &explicit_scores, &ManyShotClasses::default(), None).unwrap();

        assert_eq!(derived, explicit);
    }

    #[test]
    fn explicit_sparse_action_scores_are_used() {
        let gt = GroundTruth::new(array![0, 1], array![0, 1]).unwrap();
        let mut scores = TaskScores::new();
        scores.insert(Task::Verb, Scores::from(array![[0.9, 0.1], [0.1, 0.9]]));
        scores.insert(Task::Noun, Scores::from(array![[0.9, 0.1], [0.1, 0.9]]));
        // Action scores that disagree with verb and noun: always predict action 353.
        scores.insert(
            Task::Action,
            Scores::Sparse(vec![
                SparseScores::from([(353, 0.9), (0, 0.1)]),
                SparseScores::from([(353, 0.9), (0, 0.1)]),
            ]),
        );

        let metrics = compute_metrics(&gt, &scores, &ManyShotClasses::default(), None).unwrap();
        assert_eq!(metrics.accuracy.verb, vec![1.0, 1.0]);
        assert_eq!(metrics.accuracy.action, vec![0.5, 1.0]);
    }

    #[test]
    fn priors_change_action_ranking() {
        let gt = GroundTruth::new(array![0], array![1]).unwrap();
        let mut scores = TaskScores::new();
        scores.insert(Task::Verb, Scores::from(array![[0.9, 0.1]]));
        scores.insert(Task::Noun, Scores::from(array![[0.9, 0.1]]));

        let without = compute_metrics(&gt, &scores, &ManyShotClasses::default(), None).unwrap();
        assert_eq!(without.accuracy.action[0], 0.0);

        // Only (0, 1) is plausible.
        let priors = array![[0.0, 1.0], [0.0, 0.0]];
        let many_shot = ManyShotClasses::default();
        let with = compute_metrics(&gt, &scores, &many_shot, Some(priors.view())).unwrap();
        assert_eq!(with.accuracy.action[0], 1.0);
    }

    #[test]
    fn wrong_prior_shape() {
        let priors = Array2::<f64>::ones((3, 3));
        let err = compute_metrics(
            &groundtruth(),
            &task_scores(),
            &ManyShotClasses::default(),
            Some(priors.view()),
        )
        .unwrap_err();
        assert!(matches!(err, MetricsError::Shape { what: "action_priors", .. }));
    }

    #[test]
    fn too_many_noun_classes_for_action_ids() {
        let gt = GroundTruth::new(array![0], array![0]).unwrap();
        let mut scores = TaskScores::new();
        scores.insert(Task::Verb, Scores::from(array![[1.0]]));
        scores.insert(Task::Noun, Scores::from(Array2::<f64>::zeros((1, NOUN_CLASS_COUNT + 1))));
        let err = compute_metrics(&gt, &scores, &ManyShotClasses::default(), None).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidParameter { name: "noun scores", .. }));
    }

    #[test]
    fn many_shot_sets_restrict_precision() {
        let gt = groundtruth();
        let scores = task_scores();
        // verb predictions: 0, 0, 0, 1 ; labels 0, 1, 0, 1
        let many_shot = ManyShotClasses::new([1], [0, 1], [ActionClass::new(0, 0)]);
        let metrics = compute_metrics(&gt, &scores, &many_shot, None).unwrap();

        assert_abs_diff_eq!(metrics.precision.verb, 1.0, epsilon = DEFAULT_TOLERANCE);
        assert_abs_diff_eq!(metrics.recall.verb, 0.5, epsilon = DEFAULT_TOLERANCE);
        assert_eq!(metrics.precision.verb_per_class.len(), 1);
        assert!(metrics.precision.verb_per_class.contains_key("1"));
    }

    #[test]
    fn many_shot_actions_without_action_id_are_skipped() {
        // action predictions: (0, 0), (0, 1), (0, 0), (1, 1)
        let many_shot = ManyShotClasses::default().with_actions([
            ActionClass::new(0, 0),
            ActionClass::new(usize::MAX / 10, 0),
            ActionClass::new(0, NOUN_CLASS_COUNT + 48),
        ]);
        let metrics = compute_metrics(&groundtruth(), &task_scores(), &many_shot, None).unwrap();

        assert_abs_diff_eq!(metrics.precision.action, 0.5, epsilon = DEFAULT_TOLERANCE);
        assert_abs_diff_eq!(metrics.recall.action, 1.0, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn custom_ks_leave_action_ks() {
        let config = MetricsConfig::builder().ks(vec![1]).build().unwrap();
        let metrics = Evaluator::new(config)
            .evaluate(&groundtruth(), &task_scores(), &ManyShotClasses::default(), None)
            .unwrap();
        assert_eq!(metrics.accuracy.verb.len(), 1);
        assert_eq!(metrics.accuracy.noun.len(), 1);
        assert_eq!(metrics.accuracy.action.len(), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = MetricsConfig::builder()
            .parallelism(crate::utils::Parallelism::Parallel)
            .build()
            .unwrap();
        let gt = groundtruth();
        let scores = task_scores();
        let parallel = Evaluator::new(config)
            .evaluate(&gt, &scores, &ManyShotClasses::default(), None)
            .unwrap();
        let sequential = compute_metrics(&gt, &scores, &ManyShotClasses::default(), None).unwrap();
        assert_eq!(parallel, sequential);
    }
}
