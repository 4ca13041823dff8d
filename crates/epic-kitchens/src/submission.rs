//! Competition submission files.
//!
//! A submission holds the verb and noun scores of every test segment:
//!
//! ```json
//! {
//!   "version": "0.1",
//!   "challenge": "action_recognition",
//!   "results": {
//!     "1924": {
//!       "verb": {"0": 1.223, "1": 4.278, "124": 0.023},
//!       "noun": {"0": 0.804, "1": 1.870, "351": 0.023}
//!     }
//!   }
//! }
//! ```
//!
//! Keys of `results` are segment uids; class ids are stringified integers.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, MetricsError};
use crate::scoring::{Scores, Task, TaskScores};

/// Schema version written by default.
pub const DEFAULT_VERSION: &str = "0.1";

/// Challenge a submission is entered into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    #[default]
    ActionRecognition,
    ActionAnticipation,
}

/// Verb and noun scores of one segment, keyed by class id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentScores {
    pub verb: BTreeMap<usize, f64>,
    pub noun: BTreeMap<usize, f64>,
}

/// A results file for the recognition or anticipation challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub version: String,
    pub challenge: Challenge,
    pub results: BTreeMap<u64, SegmentScores>,
}

impl Submission {
    /// Build a submission from dense `[n_segments, n_classes]` score matrices.
    ///
    /// Row `i` of both matrices belongs to segment `uids[i]`.
    ///
    /// # Errors
    ///
    /// Fails if either matrix does not have one row per uid.
    pub fn create(
        uids: ArrayView1<'_, u64>,
        verb_scores: ArrayView2<'_, f64>,
        noun_scores: ArrayView2<'_, f64>,
        challenge: Challenge,
        version: impl Into<String>,
    ) -> Result<Self, MetricsError> {
        let row_counts = [
            ("verb score rows", verb_scores.nrows()),
            ("noun score rows", noun_scores.nrows()),
        ];
        for (what, rows) in row_counts {
            if rows != uids.len() {
                return Err(MetricsError::LengthMismatch {
                    what,
                    expected: uids.len(),
                    got: rows,
                });
            }
        }

        let row_to_map = |row: ArrayView1<'_, f64>| -> BTreeMap<usize, f64> {
            row.iter().copied().enumerate().collect()
        };
        let results = uids
            .iter()
            .zip(verb_scores.rows())
            .zip(noun_scores.rows())
            .map(|((&uid, verb), noun)| {
                let segment = SegmentScores {
                    verb: row_to_map(verb),
                    noun: row_to_map(noun),
                };
                (uid, segment)
            })
            .collect();

        Ok(Self {
            version: version.into(),
            challenge,
            results,
        })
    }

    /// Build a submission from the verb and noun entries of `scores`.
    ///
    /// Other entries (e.g. action scores) are not part of the format and are
    /// ignored.
    pub fn from_task_scores(
        uids: ArrayView1<'_, u64>,
        scores: &TaskScores,
        challenge: Challenge,
        version: impl Into<String>,
    ) -> Result<Self, MetricsError> {
        let verbs = task_dense_2d(scores, Task::Verb, "verb scores")?;
        let nouns = task_dense_2d(scores, Task::Noun, "noun scores")?;
        Self::create(uids, verbs, nouns, challenge, version)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Dense verb and noun scores in the order of `uids`.
    ///
    /// The number of classes of a task is one more than the largest class id
    /// in the submission; every segment must score every class.
    ///
    /// # Errors
    ///
    /// Fails if a uid has no results or a segment lacks a class score.
    pub fn to_scores(&self, uids: &[u64]) -> Result<TaskScores, MetricsError> {
        let segments = uids
            .iter()
            .map(|uid| {
                self.results.get(uid).ok_or_else(|| MetricsError::InvalidParameter {
                    name: "uid",
                    reason: format!("no results for segment {uid}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let verbs = dense_scores(uids, &segments, Task::Verb, |s| &s.verb)?;
        let nouns = dense_scores(uids, &segments, Task::Noun, |s| &s.noun)?;

        let mut scores = TaskScores::new();
        scores.insert(Task::Verb, Scores::from(verbs));
        scores.insert(Task::Noun, Scores::from(nouns));
        Ok(scores)
    }

    // =========================================================================
    // JSON
    // =========================================================================

    pub fn to_json_string(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), LoadError> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let submission: Self = serde_json::from_reader(reader)?;
        log::debug!(
            "read {:?} submission v{} with {} segments",
            submission.challenge,
            submission.version,
            submission.len()
        );
        Ok(submission)
    }
}

/// Build a submission with the default schema version.
///
/// See [`Submission::create`].
pub fn create_submission(
    uids: ArrayView1<'_, u64>,
    verb_scores: ArrayView2<'_, f64>,
    noun_scores: ArrayView2<'_, f64>,
    challenge: Challenge,
) -> Result<Submission, MetricsError> {
    Submission::create(uids, verb_scores, noun_scores, challenge, DEFAULT_VERSION)
}

fn task_dense_2d<'a>(
    scores: &'a TaskScores,
    task: Task,
    what: &'static str,
) -> Result<ArrayView2<'a, f64>, MetricsError> {
    scores
        .get(&task)
        .ok_or_else(|| MetricsError::MissingScores(task.to_string()))?
        .dense_2d(what)
}

fn dense_scores<F>(
    uids: &[u64],
    segments: &[&SegmentScores],
    task: Task,
    select: F,
) -> Result<Array2<f64>, MetricsError>
where
    F: Fn(&SegmentScores) -> &BTreeMap<usize, f64>,
{
    let n_classes = segments
        .iter()
        .filter_map(|s| select(s).keys().next_back())
        .max()
        .map_or(0, |&c| c + 1);

    let mut out = Array2::zeros((segments.len(), n_classes));
    for ((mut row, segment), uid) in out.rows_mut().into_iter().zip(segments).zip(uids) {
        let class_scores = select(segment);
        for (class, slot) in row.iter_mut().enumerate() {
            *slot = *class_scores.get(&class).ok_or_else(|| MetricsError::InvalidParameter {
                name: "submission",
                reason: format!("segment {uid} has no {task} score for class {class}"),
            })?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn submission() -> Submission {
        let uids = array![1924u64, 1925];
        let verbs = array![[1.5, 4.25], [0.5, 0.25]];
        let nouns = array![[0.75, 1.0, 2.0], [0.0, 0.5, 1.0]];
        create_submission(uids.view(), verbs.view(), nouns.view(), Challenge::ActionRecognition)
            .unwrap()
    }

    #[test]
    fn json_layout() {
        let value: serde_json::Value =
            serde_json::from_str(&submission().to_json_string().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "version": "0.1",
                "challenge": "action_recognition",
                "results": {
                    "1924": {
                        "verb": {"0": 1.5, "1": 4.25},
                        "noun": {"0": 0.75, "1": 1.0, "2": 2.0}
                    },
                    "1925": {
                        "verb": {"0": 0.5, "1": 0.25},
                        "noun": {"0": 0.0, "1": 0.5, "2": 1.0}
                    }
                }
            })
        );
    }

    #[test]
    fn anticipation_challenge_name() {
        let json = serde_json::to_string(&Challenge::ActionAnticipation).unwrap();
        assert_eq!(json, "\"action_anticipation\"");
    }

    #[test]
    fn reads_back_written_json() {
        let mut buf = Vec::new();
        submission().write_json(&mut buf).unwrap();
        let back = Submission::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back, submission());
    }

    #[test]
    fn uid_count_must_match_rows() {
        let uids = array![1u64];
        let verbs = array![[0.1, 0.9], [0.5, 0.5]];
        let nouns = array![[1.0]];
        let err = Submission::create(
            uids.view(),
            verbs.view(),
            nouns.view(),
            Challenge::default(),
            "0.1",
        )
        .unwrap_err();
        assert!(matches!(err, MetricsError::LengthMismatch { what: "verb score rows", .. }));
    }

    #[test]
    fn from_task_scores_requires_noun() {
        let mut scores = TaskScores::new();
        scores.insert(Task::Verb, Scores::from(array![[0.1, 0.9]]));
        let uids = array![1u64];
        let err = Submission::from_task_scores(uids.view(), &scores, Challenge::default(), "0.1")
            .unwrap_err();
        assert_eq!(err, MetricsError::MissingScores("noun".to_string()));
    }

    #[test]
    fn to_scores_follows_uid_order() {
        let scores = submission().to_scores(&[1925, 1924]).unwrap();
        assert_eq!(scores[&Task::Verb], Scores::from(array![[0.5, 0.25], [1.5, 4.25]]));
        assert_eq!(
            scores[&Task::Noun],
            Scores::from(array![[0.0, 0.5, 1.0], [0.75, 1.0, 2.0]])
        );
    }

    #[test]
    fn to_scores_missing_uid_or_class() {
        let sub = submission();
        assert!(sub.to_scores(&[7]).is_err());

        let mut sub = submission();
        if let Some(segment) = sub.results.get_mut(&1925) {
            segment.verb.remove(&0);
        }
        let err = sub.to_scores(&[1924, 1925]).unwrap_err();
        assert!(err.to_string().contains("segment 1925 has no verb score for class 0"));
    }

    #[test]
    fn rejects_unknown_challenge() {
        let json = r#"{"version": "0.1", "challenge": "segmentation", "results": {}}"#;
        assert!(matches!(Submission::from_json_str(json), Err(LoadError::Json(_))));
    }
}
