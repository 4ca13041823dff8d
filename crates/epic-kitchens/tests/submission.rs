//! Submission files and evaluation of on-disk annotations.

use std::fs;

use epic_kitchens::classes::{MANY_SHOT_ACTIONS_FILE, MANY_SHOT_NOUNS_FILE, MANY_SHOT_VERBS_FILE};
use epic_kitchens::submission::DEFAULT_VERSION;
use epic_kitchens::testing::{DEFAULT_TOLERANCE, assert_slice_approx_eq, random_scores};
use epic_kitchens::{
    Challenge, GroundTruth, LoadError, ManyShotClasses, Submission, Task, assert_approx_eq,
    compute_metrics, create_submission,
};
use ndarray::array;
use serde_json::Value;

#[test]
fn submission_json_contract() {
    let uids = array![1924u64, 1925, 1926];
    let verbs = random_scores(3, 125, 1);
    let nouns = random_scores(3, 352, 2);
    let submission =
        create_submission(uids.view(), verbs.view(), nouns.view(), Challenge::ActionRecognition)
            .unwrap();

    let json: Value = serde_json::from_str(&submission.to_json_string().unwrap()).unwrap();
    assert_eq!(json["version"], DEFAULT_VERSION);
    assert_eq!(json["challenge"], "action_recognition");

    let results = json["results"].as_object().unwrap();
    assert_eq!(results.len(), 3);
    let segment = &results["1925"];
    assert_eq!(segment["verb"].as_object().unwrap().len(), 125);
    assert_eq!(segment["noun"].as_object().unwrap().len(), 352);
    assert_approx_eq!(
        segment["noun"]["351"].as_f64().unwrap(),
        nouns[[1, 351]],
        DEFAULT_TOLERANCE
    );
}

#[test]
fn anticipation_submission_reads_back() {
    let uids = array![7u64];
    let verbs = array![[0.25, 0.75]];
    let nouns = array![[0.5, 0.5]];
    let submission = Submission::create(
        uids.view(),
        verbs.view(),
        nouns.view(),
        Challenge::ActionAnticipation,
        "0.2",
    )
    .unwrap();

    let back = Submission::from_json_str(&submission.to_json_string().unwrap()).unwrap();
    assert_eq!(back.challenge, Challenge::ActionAnticipation);
    assert_eq!(back.version, "0.2");
    assert_eq!(back, submission);
}

#[test]
fn malformed_submission() {
    let err = Submission::from_json_str(r#"{"version": "0.1"}"#).unwrap_err();
    assert!(matches!(err, LoadError::Json(_)));
}

#[test]
fn evaluate_submission_against_annotations_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("labels.csv"),
        "uid,video_id,verb_class,noun_class\n\
         10,P01_11,0,1\n\
         11,P01_11,1,0\n\
         12,P01_11,1,1\n",
    )
    .unwrap();
    fs::write(dir.path().join(MANY_SHOT_VERBS_FILE), "verb_class,verb\n0,take\n1,put\n").unwrap();
    fs::write(dir.path().join(MANY_SHOT_NOUNS_FILE), "noun_class,noun\n0,plate\n1,cup\n").unwrap();
    fs::write(
        dir.path().join(MANY_SHOT_ACTIONS_FILE),
        "action_class,verb_class,verb,noun_class,noun\n\
         \"(0, 1)\",0,take,1,cup\n\
         \"(1, 1)\",1,put,1,cup\n",
    )
    .unwrap();

    let groundtruth = GroundTruth::from_csv_path(dir.path().join("labels.csv")).unwrap();
    let many_shot = ManyShotClasses::from_dir(dir.path()).unwrap();

    // Submission lists segments in a different order than the annotations.
    let submission_json = r#"{
        "version": "0.1",
        "challenge": "action_recognition",
        "results": {
            "12": {"verb": {"0": 0.1, "1": 0.9}, "noun": {"0": 0.3, "1": 0.7}},
            "10": {"verb": {"0": 0.8, "1": 0.2}, "noun": {"0": 0.4, "1": 0.6}},
            "11": {"verb": {"0": 0.6, "1": 0.4}, "noun": {"0": 0.9, "1": 0.1}}
        }
    }"#;
    let submission = Submission::from_reader(submission_json.as_bytes()).unwrap();

    let uids = groundtruth.uids().unwrap().to_vec();
    let scores = submission.to_scores(&uids).unwrap();
    assert_eq!(scores[&Task::Verb].n_instances(), 3);

    let metrics = compute_metrics(&groundtruth, &scores, &many_shot, None).unwrap();
    // verb predictions 0, 0, 1 against labels 0, 1, 1
    assert_slice_approx_eq(&metrics.accuracy.verb, &[2.0 / 3.0, 1.0], DEFAULT_TOLERANCE, "verb");
    // noun predictions 1, 0, 1 are all correct
    assert_slice_approx_eq(&metrics.accuracy.noun, &[1.0, 1.0], DEFAULT_TOLERANCE, "noun");
    // action predictions (0, 1), (0, 0), (1, 1) against (0, 1), (1, 0), (1, 1)
    let expected = [2.0 / 3.0, 1.0];
    assert_slice_approx_eq(&metrics.accuracy.action, &expected, DEFAULT_TOLERANCE, "action");
    // many-shot actions (0, 1) and (1, 1) are both predicted correctly once
    assert_approx_eq!(metrics.precision.action, 1.0, DEFAULT_TOLERANCE);
    assert_approx_eq!(metrics.recall.action, 1.0, DEFAULT_TOLERANCE);
}
