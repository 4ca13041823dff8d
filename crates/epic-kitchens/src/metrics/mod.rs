//! Evaluation metrics for verb, noun and action recognition.
//!
//! Metrics are computed from rank arrays, never directly from scores:
//!
//! ```text
//! scores ──scores_to_ranks──▶ ranks ──┬─▶ top-k accuracy        (class-aware)
//!                                     └─▶ many-shot precision/recall (class-agnostic)
//! ```
//!
//! # Available Metrics
//!
//! - [`topk_accuracy`]: fraction of instances whose label is in the top k
//! - [`precision_recall`]: per-class precision and recall of the top-1 prediction
//! - [`compute_class_aware_metrics`]: top-k accuracy of every task
//! - [`compute_class_agnostic_metrics`]: macro precision/recall over many-shot classes
//!
//! [`Evaluator`] (or the [`compute_metrics`] shorthand) runs the full
//! pipeline and returns a [`MetricsResult`].
//!
//! # Result Format
//!
//! [`MetricsResult`] serializes to the nested mapping consumed by reporting
//! code:
//!
//! ```text
//! accuracy:  { verb: [top_1, top_5], noun: [...], action: [...] }
//! precision: { verb: f, noun: f, action: f, verb_per_class: { "<verb id>": f } }
//! recall:    { verb: f, noun: f, action: f, verb_per_class: { "<verb id>": f } }
//! ```
//!
//! Macro averages over an empty many-shot set are NaN and serialize as `null`.

mod classification;
mod config;
mod eval;
mod groundtruth;
mod tasks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use classification::{
    PrecisionRecall, exclude_non_existent_classes, precision_recall, topk_accuracy,
    topk_accuracy_at,
};
pub use config::{ConfigError, MetricsConfig, MetricsConfigBuilder};
pub use eval::{Evaluator, compute_metrics};
pub use groundtruth::{GroundTruth, NOUN_CLASS_COLUMN, UID_COLUMN, VERB_CLASS_COLUMN};
pub use tasks::{
    ClassAgnosticMetrics, TaskRanks, compute_class_agnostic_metrics, compute_class_aware_metrics,
};

// =============================================================================
// Results
// =============================================================================

/// Top-k accuracies of every task, in the order of the requested k values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAccuracies {
    pub verb: Vec<f64>,
    pub noun: Vec<f64>,
    pub action: Vec<f64>,
}

/// A macro averaged many-shot metric (precision or recall) of every task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManyShotMetrics {
    pub verb: f64,
    pub noun: f64,
    pub action: f64,
    /// Metric of every many-shot verb class, keyed by the stringified class id.
    pub verb_per_class: BTreeMap<String, f64>,
}

/// All evaluation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub accuracy: TaskAccuracies,
    pub precision: ManyShotMetrics,
    pub recall: ManyShotMetrics,
}

impl MetricsResult {
    /// Serialize to the JSON result format.
    pub fn to_json(&self) -> serde_json::Value {
        // Plain structs of numbers, strings and maps always serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
