//! Score ranking and action score composition.
//!
//! - [`ranking`]: convert dense or sparse scores into class rankings, plus the
//!   [`top_scores`] and [`softmax`] primitives
//! - [`action`]: compose a pruned joint action ranking from independent verb
//!   and noun scores
//!
//! Data flows `scores → ranks` for every task; the action task either comes
//! with its own (sparse) scores or is derived from the verb and noun scores by
//! [`ActionScorer`].

pub mod action;
pub mod ranking;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use action::{ActionScorer, ActionScores, compute_action_scores};
pub use ranking::{
    Scores, SparseScores, scores_dict_to_ranks, scores_to_ranks, softmax, softmax_row,
    top_scores, top_scores_row,
};

/// Recognition task a set of scores or labels belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Verb,
    Noun,
    Action,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Verb, Task::Noun, Task::Action];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Verb => "verb",
            Task::Noun => "noun",
            Task::Action => "action",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores of every task, keyed by [`Task`].
pub type TaskScores = BTreeMap<Task, Scores>;
