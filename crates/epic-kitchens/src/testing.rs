//! Testing utilities for epic-kitchens.
//!
//! Assertion helpers and seeded data generators shared by unit tests and the
//! integration tests under `tests/`.
//!
//! ```
//! use epic_kitchens::testing::{random_scores, DEFAULT_TOLERANCE};
//! use epic_kitchens::{assert_approx_eq, softmax};
//!
//! let scores = random_scores(4, 10, 42);
//! let p = softmax(scores.view());
//! assert_approx_eq!(p.row(0).sum(), 1.0, DEFAULT_TOLERANCE);
//! ```

use ndarray::{Array1, Array2};
use rand::prelude::*;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons of probabilities and
/// metric values.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are approximately equal.
///
/// Two NaNs compare equal, since an empty many-shot set yields a NaN metric.
///
/// # Examples
///
/// ```
/// # use epic_kitchens::assert_approx_eq;
/// assert_approx_eq!(1.0, 1.0001, 0.001);
/// assert_approx_eq!(f64::NAN, f64::NAN, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let both_nan = left_val.is_nan() && right_val.is_nan();
        let diff = (left_val - right_val).abs();
        if !both_nan && !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  \
                 diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let both_nan = left_val.is_nan() && right_val.is_nan();
        let diff = (left_val - right_val).abs();
        if !both_nan && !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  \
                 diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

/// Assert that two slices of f64 values are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        if a.is_nan() && e.is_nan() {
            continue;
        }
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}]: {a} ≠ {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

// =============================================================================
// Data Generators
// =============================================================================

/// Random dense scores of shape `[rows, cols]`, uniform in `[0, 1)`.
pub fn random_scores(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((rows, cols), || rng.r#gen::<f64>())
}

/// Random logits of shape `[rows, cols]`, uniform in `[-scale, scale)`.
pub fn random_logits(rows: usize, cols: usize, seed: u64, scale: f64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((rows, cols), || (rng.r#gen::<f64>() * 2.0 - 1.0) * scale)
}

/// Random class labels in `[0, n_classes)`.
pub fn random_labels(n: usize, n_classes: usize, seed: u64) -> Array1<usize> {
    assert!(n_classes > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n_classes)).collect()
}

/// Scores that rank `labels[i]` first for every row, with `n_classes` columns.
pub fn perfect_scores(labels: &[usize], n_classes: usize) -> Array2<f64> {
    let mut scores = Array2::zeros((labels.len(), n_classes));
    for (i, &label) in labels.iter().enumerate() {
        scores[[i, label]] = 1.0;
    }
    scores
}
