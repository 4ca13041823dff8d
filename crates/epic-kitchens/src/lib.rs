//! epic-kitchens: action scoring and evaluation metrics for egocentric
//! action recognition.
//!
//! Verb and noun classifiers are trained independently, so an action
//! (`(verb, noun)` pair) prediction has to be composed from two class
//! distributions before it can be ranked. This crate provides that
//! composition together with the standard EPIC-KITCHENS metrics.
//!
//! # Key Types
//!
//! - [`Scores`] - Dense or sparse per-class scores for one task
//! - [`ActionScores`] / [`ActionScorer`] - Pruned joint verb×noun ranking
//! - [`ClassVocabulary`] - Verb/noun class names and the words clustered into them
//! - [`GroundTruth`] - Ground-truth verb/noun labels
//! - [`Evaluator`] / [`MetricsConfig`] - Metric computation
//! - [`MetricsResult`] - The metrics "wire format" consumed by reporting code
//! - [`Submission`] - Competition results file
//!
//! # Evaluating predictions
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use epic_kitchens::{compute_metrics, GroundTruth, ManyShotClasses, Scores, Task};
//! use ndarray::array;
//!
//! let groundtruth = GroundTruth::new(array![0, 1], array![2, 0]).unwrap();
//! let mut scores = BTreeMap::new();
//! scores.insert(Task::Verb, Scores::from(array![[0.9, 0.1], [0.2, 0.8]]));
//! scores.insert(Task::Noun, Scores::from(array![[0.1, 0.2, 0.7], [0.6, 0.3, 0.1]]));
//!
//! let many_shot = ManyShotClasses::default();
//! let metrics = compute_metrics(&groundtruth, &scores, &many_shot, None).unwrap();
//! assert_eq!(metrics.accuracy.verb[0], 1.0);
//! assert_eq!(metrics.accuracy.action[0], 1.0);
//! ```
//!
//! See the [`metrics`] module for details.

// Re-export approx traits for users who want to compare scores
pub use approx;

pub mod classes;
pub mod error;
mod io;
pub mod metrics;
pub mod scoring;
pub mod submission;
pub mod testing;
pub mod time;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Class encoding and metadata
pub use classes::{
    ActionClass, ClassKind, ClassVocabulary, EMPTY_NOUN_CLASS, ManyShotClasses, NOUN_CLASS_COUNT,
    VERB_CLASS_COUNT, action_id_from_verb_noun, action_tuples_to_ids, checked_action_id,
    noun_id_from_action_id, verb_id_from_action_id,
};

// Errors
pub use error::{ErrorKind, LoadError, MetricsError};

// Scoring
pub use scoring::{
    ActionScorer, ActionScores, Scores, SparseScores, Task, TaskScores, compute_action_scores,
    scores_dict_to_ranks, scores_to_ranks, softmax, softmax_row, top_scores, top_scores_row,
};

// Metrics
pub use metrics::{
    ConfigError, Evaluator, GroundTruth, MetricsConfig, MetricsResult,
    compute_class_agnostic_metrics, compute_class_aware_metrics, compute_metrics,
    precision_recall, topk_accuracy,
};

// Submissions
pub use submission::{Challenge, Submission, create_submission};

// Shared utilities
pub use utils::Parallelism;
