//! Common utilities used across the crate.
//!
//! Sorting helpers shared by the ranking code, and the parallelism flag used
//! by per-instance score composition.

use std::cmp::Ordering;

use ndarray::ArrayView1;
use rayon::prelude::*;

// =============================================================================
// Ordering
// =============================================================================

/// Descending comparison of two scores.
///
/// Every NaN, whatever its sign bit, sorts before every other value and
/// compares equal to other NaNs. Remaining values follow
/// [`f64::total_cmp`], so the ordering is total.
#[inline]
pub(crate) fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => b.total_cmp(&a),
    }
}

/// Indices of `values` sorted by descending value.
///
/// The sort is stable: equal values keep ascending index order.
pub(crate) fn argsort_descending(values: ArrayView1<'_, f64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| descending(values[a], values[b]));
    indices
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, independent per-instance work may run on the current
/// `rayon` pool. Results never depend on the choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map `f` over `0..n`, collecting results in index order.
    pub fn maybe_par_map<T, F>(self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if self.is_parallel() {
            (0..n).into_par_iter().map(f).collect()
        } else {
            (0..n).map(f).collect()
        }
    }
}
