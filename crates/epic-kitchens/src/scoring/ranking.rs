//! Conversion of per-class scores into class rankings.
//!
//! A rank array has shape `[n_instances, n_classes]`; `ranks[[i, 0]]` is the
//! highest scoring class of instance `i`, `ranks[[i, 1]]` the runner-up, and
//! so on.
//!
//! # Tie-breaking
//!
//! All rankings use a stable descending sort:
//!
//! - dense scores: equal scores keep ascending class index
//! - sparse scores: equal scores keep ascending class id
//! - NaN of either sign ranks above every other score; NaNs keep their order

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Ix2, IxDyn};
use serde_json::Value;

use crate::error::MetricsError;
use crate::utils::{argsort_descending, descending};

/// Sparse `class id → score` mapping for a single instance.
pub type SparseScores = BTreeMap<usize, f64>;

// =============================================================================
// Scores
// =============================================================================

/// Scores of every instance for one task.
#[derive(Debug, Clone, PartialEq)]
pub enum Scores {
    /// Dense scores, expected to have shape `[n_instances, n_classes]`.
    ///
    /// The dimensionality is checked when the scores are used, so arrays of
    /// any rank can be carried (e.g. straight from deserialized input).
    Dense(ArrayD<f64>),
    /// One sparse mapping per instance, for class spaces too large to densify.
    Sparse(Vec<SparseScores>),
}

impl Scores {
    /// Number of instances (rows) these scores cover.
    pub fn n_instances(&self) -> usize {
        match self {
            Scores::Dense(a) => a.shape().first().copied().unwrap_or(0),
            Scores::Sparse(rows) => rows.len(),
        }
    }

    /// Human readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scores::Dense(_) => "dense array",
            Scores::Sparse(_) => "sparse mapping list",
        }
    }

    /// View dense scores as a `[n_instances, n_classes]` matrix.
    ///
    /// `what` names the scores in the error message.
    pub fn dense_2d(&self, what: &'static str) -> Result<ArrayView2<'_, f64>, MetricsError> {
        match self {
            Scores::Dense(a) => as_2d(a, what),
            Scores::Sparse(_) => Err(MetricsError::UnsupportedType(format!(
                "{} ({what} must be dense)",
                self.type_name()
            ))),
        }
    }

    /// Build scores from a JSON value.
    ///
    /// - an array of objects is sparse (`{"<class id>": score, ...}` per instance)
    /// - any other array is dense; nested arrays must be rectangular
    /// - an empty array is a dense `[0, 0]` matrix
    ///
    /// Anything else is rejected with [`MetricsError::UnsupportedType`].
    pub fn from_json(value: &Value) -> Result<Self, MetricsError> {
        match value {
            Value::Array(items) if items.is_empty() => {
                Ok(Scores::Dense(ArrayD::zeros(IxDyn(&[0, 0]))))
            }
            Value::Array(items) if items.iter().all(Value::is_object) => items
                .iter()
                .map(sparse_from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Scores::Sparse),
            Value::Array(_) => dense_from_json(value).map(Scores::Dense),
            other => Err(MetricsError::UnsupportedType(json_type_name(other).to_string())),
        }
    }
}

impl From<Array2<f64>> for Scores {
    fn from(scores: Array2<f64>) -> Self {
        Scores::Dense(scores.into_dyn())
    }
}

impl From<ArrayD<f64>> for Scores {
    fn from(scores: ArrayD<f64>) -> Self {
        Scores::Dense(scores)
    }
}

impl From<Vec<SparseScores>> for Scores {
    fn from(scores: Vec<SparseScores>) -> Self {
        Scores::Sparse(scores)
    }
}

fn as_2d<'a>(
    scores: &'a ArrayD<f64>,
    what: &'static str,
) -> Result<ArrayView2<'a, f64>, MetricsError> {
    let dimensionality = || MetricsError::Dimensionality {
        what,
        expected: 2,
        got: scores.ndim(),
    };
    if scores.ndim() != 2 {
        return Err(dimensionality());
    }
    scores.view().into_dimensionality::<Ix2>().map_err(|_| dimensionality())
}

// =============================================================================
// Ranks
// =============================================================================

/// Convert scores into a rank array of shape `[n_instances, n_classes]`.
///
/// # Errors
///
/// - dense scores that are not 2D
/// - sparse rows with differing numbers of classes (a rank array is rectangular)
pub fn scores_to_ranks(scores: &Scores) -> Result<Array2<usize>, MetricsError> {
    match scores {
        Scores::Dense(a) => Ok(dense_scores_to_ranks(as_2d(a, "scores")?)),
        Scores::Sparse(rows) => sparse_scores_to_ranks(rows),
    }
}

/// Apply [`scores_to_ranks`] to every entry of a task → scores map.
pub fn scores_dict_to_ranks<K>(
    scores: &BTreeMap<K, Scores>,
) -> Result<BTreeMap<K, Array2<usize>>, MetricsError>
where
    K: Ord + Clone,
{
    scores
        .iter()
        .map(|(task, s)| Ok((task.clone(), scores_to_ranks(s)?)))
        .collect()
}

fn dense_scores_to_ranks(scores: ArrayView2<'_, f64>) -> Array2<usize> {
    let mut ranks = Array2::zeros(scores.raw_dim());
    for (mut out, row) in ranks.rows_mut().into_iter().zip(scores.rows()) {
        for (slot, class) in out.iter_mut().zip(argsort_descending(row)) {
            *slot = class;
        }
    }
    ranks
}

fn sparse_scores_to_ranks(rows: &[SparseScores]) -> Result<Array2<usize>, MetricsError> {
    let n_classes = rows.first().map_or(0, BTreeMap::len);
    let mut ranks = Array2::zeros((rows.len(), n_classes));

    for (i, (row, mut out)) in rows.iter().zip(ranks.rows_mut()).enumerate() {
        if row.len() != n_classes {
            return Err(MetricsError::RaggedRows {
                row: i,
                expected: n_classes,
                got: row.len(),
            });
        }
        let mut entries: Vec<(usize, f64)> = row.iter().map(|(&c, &s)| (c, s)).collect();
        entries.sort_by(|a, b| descending(a.1, b.1));
        for (slot, (class, _)) in out.iter_mut().zip(entries) {
            *slot = class;
        }
    }

    Ok(ranks)
}

// =============================================================================
// Top Scores
// =============================================================================

/// The `top_k` highest scoring classes of each row and their scores.
///
/// Returns `(classes, scores)` with shape `[n_instances, min(top_k, n_classes)]`,
/// scores in descending order so that `classes[[i, j]]` scored `scores[[i, j]]`.
/// A `top_k` larger than the number of classes returns every class.
pub fn top_scores(scores: ArrayView2<'_, f64>, top_k: usize) -> (Array2<usize>, Array2<f64>) {
    let (n_rows, n_classes) = scores.dim();
    let k = top_k.min(n_classes);
    let mut classes = Array2::zeros((n_rows, k));
    let mut values = Array2::zeros((n_rows, k));

    for ((row, mut class_out), mut value_out) in scores
        .rows()
        .into_iter()
        .zip(classes.rows_mut())
        .zip(values.rows_mut())
    {
        let (c, v) = top_scores_row(row, k);
        class_out.assign(&c);
        value_out.assign(&v);
    }

    (classes, values)
}

/// Single-vector variant of [`top_scores`].
///
/// # Example
///
/// ```
/// use epic_kitchens::top_scores_row;
/// use ndarray::array;
///
/// let (classes, scores) = top_scores_row(array![0.2, 0.6, 0.1, 0.04, 0.06].view(), 3);
/// assert_eq!(classes, array![1, 0, 2]);
/// assert_eq!(scores, array![0.6, 0.2, 0.1]);
/// ```
pub fn top_scores_row(scores: ArrayView1<'_, f64>, top_k: usize) -> (Array1<usize>, Array1<f64>) {
    let mut order = argsort_descending(scores);
    order.truncate(top_k);
    let values = order.iter().map(|&c| scores[c]).collect();
    (Array1::from(order), values)
}

// =============================================================================
// Softmax
// =============================================================================

/// Apply softmax in-place to a single row of scores.
#[inline]
fn softmax_row_inplace(mut row: ArrayViewMut1<'_, f64>) {
    if row.is_empty() {
        return;
    }

    // Find max for numerical stability
    let max_val = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sum = 0.0f64;
    for x in row.iter_mut() {
        *x = (*x - max_val).exp();
        sum += *x;
    }

    if sum > 0.0 {
        row.mapv_inplace(|x| x / sum);
    }
}

/// Row-wise softmax of a `[n_instances, n_classes]` matrix.
///
/// The per-row maximum is subtracted before exponentiation, so large scores
/// do not overflow and adding a constant to a row leaves its output unchanged.
pub fn softmax(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = x.to_owned();
    for row in out.axis_iter_mut(Axis(0)) {
        softmax_row_inplace(row);
    }
    out
}

/// Softmax of a single score vector.
///
/// # Example
///
/// ```
/// use epic_kitchens::softmax_row;
/// use ndarray::array;
///
/// let p = softmax_row(array![0.0, 200.0, 10.0].view());
/// assert!((p.sum() - 1.0).abs() < 1e-12);
/// assert!((p[1] - 1.0).abs() < 1e-4);
/// ```
pub fn softmax_row(x: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut out = x.to_owned();
    softmax_row_inplace(out.view_mut());
    out
}

// =============================================================================
// JSON
// =============================================================================

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn sparse_from_json(value: &Value) -> Result<SparseScores, MetricsError> {
    let Value::Object(map) = value else {
        return Err(MetricsError::UnsupportedType(json_type_name(value).to_string()));
    };
    map.iter()
        .map(|(key, score)| {
            let class = key.parse::<usize>().map_err(|_| MetricsError::InvalidParameter {
                name: "class id",
                reason: format!("{key:?} is not a non-negative integer"),
            })?;
            let score = score
                .as_f64()
                .ok_or_else(|| MetricsError::UnsupportedType(json_type_name(score).to_string()))?;
            Ok((class, score))
        })
        .collect()
}

fn dense_from_json(value: &Value) -> Result<ArrayD<f64>, MetricsError> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }

    let mut flat = Vec::with_capacity(shape.iter().product());
    flatten_json(value, 0, &shape, &mut flat)?;
    ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| MetricsError::InvalidParameter {
        name: "scores",
        reason: e.to_string(),
    })
}

fn flatten_json(
    value: &Value,
    depth: usize,
    shape: &[usize],
    out: &mut Vec<f64>,
) -> Result<(), MetricsError> {
    if depth == shape.len() {
        let x = value
            .as_f64()
            .ok_or_else(|| MetricsError::UnsupportedType(json_type_name(value).to_string()))?;
        out.push(x);
        return Ok(());
    }

    let Value::Array(items) = value else {
        return Err(MetricsError::UnsupportedType(json_type_name(value).to_string()));
    };
    if items.len() != shape[depth] {
        return Err(MetricsError::RaggedRows {
            row: out.len() / shape[depth].max(1),
            expected: shape[depth],
            got: items.len(),
        });
    }
    items
        .iter()
        .try_for_each(|item| flatten_json(item, depth + 1, shape, out))
}

// =============================================================================
// Tests
// =============================================================================
