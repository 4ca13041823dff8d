//! Classification metrics over rank arrays.
//!
//! Every function here takes a `[n_instances, n_classes]` rank array (see
//! [`scores_to_ranks`](crate::scoring::scores_to_ranks)) and a label vector
//! with one entry per instance.

use std::collections::{BTreeSet, HashMap};

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::MetricsError;

fn check_label_predictions(
    rankings: ArrayView2<'_, usize>,
    labels: ArrayView1<'_, usize>,
) -> Result<(), MetricsError> {
    if labels.len() != rankings.nrows() {
        return Err(MetricsError::LengthMismatch {
            what: "labels",
            expected: rankings.nrows(),
            got: labels.len(),
        });
    }
    Ok(())
}

// =============================================================================
// Top-k Accuracy
// =============================================================================

/// Top-k accuracy for every `k` in `ks`, in the order given.
///
/// An instance counts as correct at `k` when its label is among its first `k`
/// ranked classes. A `k` larger than the number of ranked classes is clamped.
/// Zero instances give NaN.
///
/// # Errors
///
/// - `labels` and `rankings` disagree in the number of instances
/// - `ks` is empty or contains `0`
///
/// # Example
///
/// ```
/// use epic_kitchens::topk_accuracy;
/// use ndarray::array;
///
/// let ranks = array![[1, 2, 3], [2, 3, 1], [3, 1, 2], [1, 2, 3]];
/// let labels = array![1, 3, 2, 1];
/// let acc = topk_accuracy(ranks.view(), labels.view(), &[1, 3, 5]).unwrap();
/// assert_eq!(acc, vec![0.5, 1.0, 1.0]);
/// ```
pub fn topk_accuracy(
    rankings: ArrayView2<'_, usize>,
    labels: ArrayView1<'_, usize>,
    ks: &[usize],
) -> Result<Vec<f64>, MetricsError> {
    check_label_predictions(rankings, labels)?;
    if ks.is_empty() {
        return Err(MetricsError::InvalidParameter {
            name: "ks",
            reason: "at least one k is required".to_string(),
        });
    }
    if ks.contains(&0) {
        return Err(MetricsError::InvalidParameter {
            name: "ks",
            reason: "k must be at least 1".to_string(),
        });
    }

    // Position of the label within each row, if ranked at all.
    let max_k = ks.iter().copied().max().unwrap_or(0).min(rankings.ncols());
    let hit_at: Vec<Option<usize>> = rankings
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, label)| row.iter().take(max_k).position(|c| c == label))
        .collect();

    let n = hit_at.len() as f64;
    Ok(ks
        .iter()
        .map(|&k| {
            let hits = hit_at.iter().filter(|pos| pos.is_some_and(|p| p < k)).count();
            hits as f64 / n
        })
        .collect())
}

/// Top-k accuracy for a single `k`.
pub fn topk_accuracy_at(
    rankings: ArrayView2<'_, usize>,
    labels: ArrayView1<'_, usize>,
    k: usize,
) -> Result<f64, MetricsError> {
    let accuracies = topk_accuracy(rankings, labels, &[k])?;
    Ok(accuracies[0])
}

// =============================================================================
// Precision / Recall
// =============================================================================

/// Per-class precision and recall, aligned with `classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionRecall {
    pub classes: Vec<usize>,
    pub precision: Array1<f64>,
    pub recall: Array1<f64>,
}

impl PrecisionRecall {
    /// Macro average precision. NaN when there are no classes.
    pub fn mean_precision(&self) -> f64 {
        self.precision.mean().unwrap_or(f64::NAN)
    }

    /// Macro average recall. NaN when there are no classes.
    pub fn mean_recall(&self) -> f64 {
        self.recall.mean().unwrap_or(f64::NAN)
    }
}

/// Per-class precision and recall of the top-1 predictions `rankings[:, 0]`.
///
/// `precision = TP / (TP + FP)` and `recall = TP / (TP + FN)` for each class;
/// a class never predicted gets precision 0.
///
/// `classes` defaults to the sorted distinct labels. Requested classes keep
/// their given order.
///
/// # Errors
///
/// - `labels` and `rankings` disagree in the number of instances
/// - `rankings` has instances but no ranked classes
/// - [`MetricsError::UnknownClasses`] if any requested class is absent from
///   `labels` (filter with [`exclude_non_existent_classes`] first)
pub fn precision_recall(
    rankings: ArrayView2<'_, usize>,
    labels: ArrayView1<'_, usize>,
    classes: Option<&[usize]>,
) -> Result<PrecisionRecall, MetricsError> {
    check_label_predictions(rankings, labels)?;
    if rankings.nrows() > 0 && rankings.ncols() == 0 {
        return Err(MetricsError::InvalidParameter {
            name: "rankings",
            reason: "at least one ranked class is required".to_string(),
        });
    }

    let present: BTreeSet<usize> = labels.iter().copied().collect();
    let classes: Vec<usize> = match classes {
        None => present.iter().copied().collect(),
        Some(requested) => {
            let missing: Vec<usize> = requested
                .iter()
                .copied()
                .filter(|c| !present.contains(c))
                .collect();
            if !missing.is_empty() {
                return Err(MetricsError::UnknownClasses(missing));
            }
            requested.to_vec()
        }
    };

    #[derive(Default, Clone, Copy)]
    struct Counts {
        tp: usize,
        predicted: usize,
        actual: usize,
    }

    let mut counts: HashMap<usize, Counts> =
        classes.iter().map(|&c| (c, Counts::default())).collect();
    for (&label, &pred) in labels.iter().zip(rankings.column(0).iter()) {
        if let Some(c) = counts.get_mut(&label) {
            c.actual += 1;
            if pred == label {
                c.tp += 1;
            }
        }
        if let Some(c) = counts.get_mut(&pred) {
            c.predicted += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = classes
        .iter()
        .map(|c| counts.get(c).map_or(0.0, |n| ratio(n.tp, n.predicted)))
        .collect();
    let recall = classes
        .iter()
        .map(|c| counts.get(c).map_or(0.0, |n| ratio(n.tp, n.actual)))
        .collect();

    Ok(PrecisionRecall {
        classes,
        precision,
        recall,
    })
}

/// Sorted intersection of `classes` with the distinct values of `labels`.
pub fn exclude_non_existent_classes<I>(classes: I, labels: ArrayView1<'_, usize>) -> Vec<usize>
where
    I: IntoIterator<Item = usize>,
{
    let present: BTreeSet<usize> = labels.iter().copied().collect();
    let requested: BTreeSet<usize> = classes.into_iter().collect();
    requested.intersection(&present).copied().collect()
}

// =============================================================================
// Tests
// =============================================================================
