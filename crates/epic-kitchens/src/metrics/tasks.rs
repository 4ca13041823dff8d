//! Per-task metrics over verb, noun and action rankings.
//!
//! - class-aware: top-k accuracy of every task
//! - class-agnostic: precision and recall macro averaged over many-shot
//!   classes, plus a per-verb-class breakdown

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::classification::{exclude_non_existent_classes, precision_recall, topk_accuracy};
use super::groundtruth::GroundTruth;
use super::{ManyShotMetrics, TaskAccuracies};
use crate::error::MetricsError;
use crate::scoring::Task;

/// Rank arrays of every task, keyed by [`Task`].
pub type TaskRanks = BTreeMap<Task, Array2<usize>>;

/// Many-shot precision and recall of every task.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAgnosticMetrics {
    pub precision: ManyShotMetrics,
    pub recall: ManyShotMetrics,
}

fn task_ranks(ranks: &TaskRanks, task: Task) -> Result<ArrayView2<'_, usize>, MetricsError> {
    ranks
        .get(&task)
        .map(|r| r.view())
        .ok_or_else(|| MetricsError::MissingScores(task.to_string()))
}

// =============================================================================
// Class-aware
// =============================================================================

/// Top-k accuracies of every task.
///
/// Verb and noun accuracy are computed at `ks`, action accuracy at
/// `action_ks`.
pub fn compute_class_aware_metrics(
    groundtruth: &GroundTruth,
    ranks: &TaskRanks,
    ks: &[usize],
    action_ks: &[usize],
) -> Result<TaskAccuracies, MetricsError> {
    let action_class = groundtruth.action_class();
    Ok(TaskAccuracies {
        verb: topk_accuracy(task_ranks(ranks, Task::Verb)?, groundtruth.verb_class(), ks)?,
        noun: topk_accuracy(task_ranks(ranks, Task::Noun)?, groundtruth.noun_class(), ks)?,
        action: topk_accuracy(task_ranks(ranks, Task::Action)?, action_class.view(), action_ks)?,
    })
}

// =============================================================================
// Class-agnostic
// =============================================================================

/// Many-shot precision and recall of every task.
///
/// Each many-shot set is first intersected with the classes present in the
/// ground truth; absent classes are skipped instead of failing the lookup.
/// A set that ends up empty has a NaN macro average.
///
/// `many_shot_actions` holds dense action ids.
pub fn compute_class_agnostic_metrics(
    groundtruth: &GroundTruth,
    ranks: &TaskRanks,
    many_shot_verbs: &[usize],
    many_shot_nouns: &[usize],
    many_shot_actions: &[usize],
) -> Result<ClassAgnosticMetrics, MetricsError> {
    let action_class = groundtruth.action_class();

    let verbs = present_classes(Task::Verb, many_shot_verbs, groundtruth.verb_class());
    let nouns = present_classes(Task::Noun, many_shot_nouns, groundtruth.noun_class());
    let actions = present_classes(Task::Action, many_shot_actions, action_class.view());
    log::info!(
        "{} many shot actions after intersecting with actions present in test",
        actions.len()
    );

    let verb = precision_recall(
        task_ranks(ranks, Task::Verb)?,
        groundtruth.verb_class(),
        Some(verbs.as_slice()),
    )?;
    let noun = precision_recall(
        task_ranks(ranks, Task::Noun)?,
        groundtruth.noun_class(),
        Some(nouns.as_slice()),
    )?;
    let action = precision_recall(
        task_ranks(ranks, Task::Action)?,
        action_class.view(),
        Some(actions.as_slice()),
    )?;

    let per_class = |values: ArrayView1<'_, f64>| -> BTreeMap<String, f64> {
        verb.classes
            .iter()
            .zip(values.iter())
            .map(|(class, &v)| (class.to_string(), v))
            .collect()
    };

    let precision = ManyShotMetrics {
        verb: verb.mean_precision(),
        noun: noun.mean_precision(),
        action: action.mean_precision(),
        verb_per_class: per_class(verb.precision.view()),
    };
    let recall = ManyShotMetrics {
        verb: verb.mean_recall(),
        noun: noun.mean_recall(),
        action: action.mean_recall(),
        verb_per_class: per_class(verb.recall.view()),
    };
    Ok(ClassAgnosticMetrics { precision, recall })
}

/// Many-shot classes of `task` that occur in `labels`, sorted.
fn present_classes(task: Task, many_shot: &[usize], labels: ArrayView1<'_, usize>) -> Vec<usize> {
    let present = exclude_non_existent_classes(many_shot.iter().copied(), labels);
    log::debug!(
        "{} many shot {task}s before intersecting with classes present in test, {} after",
        many_shot.len(),
        present.len()
    );
    if present.is_empty() {
        log::warn!("no many shot {task} classes present in test, {task} precision/recall are NaN");
    }
    present
}
