//! Error types for scoring and evaluation.
//!
//! Almost every failure in this crate is a precondition violation on the
//! caller's arrays (wrong dimensionality, mismatched lengths, ...). Those are
//! reported as [`MetricsError`] and are never retried or partially applied:
//! either every instance of a batch is processed or the call fails.
//!
//! Reading ground truth, many-shot class files and submissions from disk
//! fails with [`LoadError`].

use std::io;

// =============================================================================
// MetricsError
// =============================================================================

/// Coarse classification of a [`MetricsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Shape, dimensionality or type mismatch of an input.
    Validation,
    /// A requested class id is absent from the provided labels.
    Lookup,
}

/// Errors raised while ranking scores or computing metrics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("expected {what} to be {expected}D, but was {got}D")]
    Dimensionality {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("expected {what} to have the shape {expected:?}, but was {got:?}")]
    Shape {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("number of {what} ({got}) does not match number of instances ({expected})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cannot compute ranks for type {0}")]
    UnsupportedType(String),

    #[error("{0} scores must be provided")]
    MissingScores(String),

    #[error("{what} {value} at row {row} is out of range (must be below {limit})")]
    ClassOutOfRange {
        what: &'static str,
        row: usize,
        value: usize,
        limit: usize,
    },

    #[error(
        "sparse score rows differ in length: row 0 has {expected} classes, row {row} has {got}"
    )]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("classes {0:?} are not in labels")]
    UnknownClasses(Vec<usize>),
}

impl MetricsError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownClasses(_) => ErrorKind::Lookup,
            _ => ErrorKind::Validation,
        }
    }

    /// Returns `true` for shape/dimensionality/type violations.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Returns `true` when a requested class id is unknown.
    pub fn is_lookup(&self) -> bool {
        self.kind() == ErrorKind::Lookup
    }
}

// =============================================================================
// LoadError
// =============================================================================

/// Errors that can occur when loading annotation or submission files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("invalid value {value:?} in column {column} (row {row})")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
