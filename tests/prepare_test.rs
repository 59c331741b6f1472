//! Run preparation integration tests
//!
//! End-to-end coverage of the public surface against a real (temporary)
//! filesystem: layout derivation, identifier stability, collision
//! handling, snapshot contents and resume.

use std::fs;

use chrono::NaiveDate;
use expman::{
    fingerprint, params, Error, ExperimentManager, MonitorMode, MonitorSpec, ParamMap, RunStamp,
};
use serde_json::json;
use tempfile::TempDir;

fn note_detection_params() -> ParamMap {
    params::from_serialize(&json!({
        "training": {"batch_size": 128, "epochs": 12, "learning-rate": 0.008},
        "processing": {"width": 128, "height": 128},
        "model": {"architecture": "cnn", "layers": 4},
        "comment": "untracked aside",
    }))
    .unwrap()
}

fn frozen_stamp() -> RunStamp {
    RunStamp::at(
        NaiveDate::from_ymd_opt(2020, 3, 3)
            .unwrap()
            .and_hms_opt(15, 52, 0)
            .unwrap(),
    )
}

fn note_detection_manager(base: &std::path::Path) -> ExperimentManager {
    ExperimentManager::builder()
        .base_dir(base.join("notedetection"))
        .monitored_keys(["training", "processing", "model"])
        .build()
}

// =============================================================================
// End-to-End Layout
// =============================================================================

#[test]
fn test_prepare_creates_documented_tree() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let handle = manager.prepare_at(&params, frozen_stamp()).unwrap();

    let fp_training = fingerprint(&params["training"]).unwrap();
    let fp_processing = fingerprint(&params["processing"]).unwrap();
    let fp_model = fingerprint(&params["model"]).unwrap();

    let expected_run_dir = tmp
        .path()
        .join("notedetection")
        .join(format!("exp-{fp_training}-{fp_processing}-{fp_model}"))
        .join("run--20-03-03--15-52");

    assert_eq!(handle.run_dir(), expected_run_dir);
    assert!(expected_run_dir.join("hyperparameters.json").is_file());
    assert!(expected_run_dir.join("performances.json").is_file());
    assert!(expected_run_dir.join("models").is_dir());
}

#[test]
fn test_identifier_segments_match_independent_fingerprints() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let id = manager.experiment_id(&params).unwrap();

    assert_eq!(id.segments().len(), 3);
    assert_eq!(id.segments()[0], fingerprint(&params["training"]).unwrap());
    assert_eq!(id.segments()[1], fingerprint(&params["processing"]).unwrap());
    assert_eq!(id.segments()[2], fingerprint(&params["model"]).unwrap());
}

#[test]
fn test_changed_group_moves_only_its_segment() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());

    let baseline = note_detection_params();
    let mut tweaked = baseline.clone();
    tweaked["training"]["learning-rate"] = json!(0.009);

    let before = manager.experiment_id(&baseline).unwrap();
    let after = manager.experiment_id(&tweaked).unwrap();

    assert_ne!(before.segments()[0], after.segments()[0]);
    assert_eq!(before.segments()[1], after.segments()[1]);
    assert_eq!(before.segments()[2], after.segments()[2]);
}

#[test]
fn test_monitored_key_order_changes_identifier() {
    let tmp = TempDir::new().unwrap();
    let params = note_detection_params();

    let forward = note_detection_manager(tmp.path())
        .experiment_id(&params)
        .unwrap();
    let permuted = ExperimentManager::builder()
        .base_dir(tmp.path().join("notedetection"))
        .monitored_keys(["model", "processing", "training"])
        .build()
        .experiment_id(&params)
        .unwrap();

    assert_ne!(forward.folder_name(), permuted.folder_name());
}

// =============================================================================
// Idempotence & Collision
// =============================================================================

#[test]
fn test_second_prepare_in_same_minute_collides() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let first = manager.prepare_at(&params, frozen_stamp()).unwrap();
    let err = manager.prepare_at(&params, frozen_stamp()).unwrap_err();

    match err {
        Error::RunDirectoryCollision(path) => assert_eq!(path, first.run_dir()),
        other => panic!("expected RunDirectoryCollision, got {other}"),
    }

    // The experiment bucket is shared and untouched by the failure.
    assert!(first.paths().experiment_dir().is_dir());
    assert!(first.hyperparams_file().is_file());
}

#[test]
fn test_next_minute_shares_the_experiment_bucket() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let later = RunStamp::at(
        NaiveDate::from_ymd_opt(2020, 3, 3)
            .unwrap()
            .and_hms_opt(15, 53, 0)
            .unwrap(),
    );

    let first = manager.prepare_at(&params, frozen_stamp()).unwrap();
    let second = manager.prepare_at(&params, later).unwrap();

    assert_eq!(
        first.paths().experiment_dir(),
        second.paths().experiment_dir()
    );
    assert_ne!(first.run_dir(), second.run_dir());
}

// =============================================================================
// Validation Before I/O
// =============================================================================

#[test]
fn test_missing_monitored_key_precedes_filesystem_mutation() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("notedetection");
    let manager = ExperimentManager::builder()
        .base_dir(&base)
        .monitored_keys(["training", "augmentation"])
        .build();

    let err = manager
        .prepare_at(&note_detection_params(), frozen_stamp())
        .unwrap_err();

    assert!(matches!(err, Error::MissingMonitoredKey(key) if key == "augmentation"));
    // Nothing was created, not even the base directory.
    assert!(!base.exists());
}

// =============================================================================
// Snapshot Contents
// =============================================================================

#[test]
fn test_snapshot_holds_full_raw_structure() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let handle = manager.prepare_at(&params, frozen_stamp()).unwrap();
    let written = fs::read_to_string(handle.hyperparams_file()).unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();

    // Untracked keys are snapshotted too: the run dir is self-describing.
    assert_eq!(reparsed["comment"], json!("untracked aside"));
    assert_eq!(reparsed["training"]["learning-rate"], json!(0.008));

    // Stable sorted key order.
    let comment_at = written.find("\"comment\"").unwrap();
    let model_at = written.find("\"model\"").unwrap();
    let training_at = written.find("\"training\"").unwrap();
    assert!(comment_at < model_at && model_at < training_at);
}

#[test]
fn test_performances_placeholder_is_empty_records() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());

    let handle = manager
        .prepare_at(&note_detection_params(), frozen_stamp())
        .unwrap();

    let placeholder: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(handle.performances_file()).unwrap()).unwrap();
    assert_eq!(placeholder, json!([]));
}

// =============================================================================
// Consumer Contract
// =============================================================================

#[test]
fn test_handle_paths_and_template_for_consumers() {
    let tmp = TempDir::new().unwrap();
    let manager = ExperimentManager::builder()
        .base_dir(tmp.path())
        .monitored_keys(["training", "processing", "model"])
        .monitor(MonitorSpec::new("val_accuracy", MonitorMode::Max))
        .build();

    let handle = manager
        .prepare_at(&note_detection_params(), frozen_stamp())
        .unwrap();

    assert_eq!(handle.csv_log_file(), handle.run_dir().join("training-logs.csv"));
    assert_eq!(handle.error_log_file(), handle.run_dir().join("errors.log"));
    assert_eq!(handle.monitor().metric(), "val_accuracy");
    assert_eq!(
        handle.model_checkpoint_path(3, 0.9312),
        handle.models_dir().join("model.03-0.9312.ckpt")
    );
}

// =============================================================================
// Resume
// =============================================================================

#[test]
fn test_resume_finds_latest_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let handle = manager.prepare_at(&params, frozen_stamp()).unwrap();
    let early = handle.model_checkpoint_path(0, 1.5);
    let late = handle.model_checkpoint_path(1, 0.9);
    fs::write(&early, b"checkpoint-0").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    fs::write(&late, b"checkpoint-1").unwrap();

    let exp_folder = handle.experiment_id().unwrap().folder_name();
    let resumed = manager.resume(&exp_folder, "run--20-03-03--15-52").unwrap();

    assert_eq!(resumed.run_dir(), handle.run_dir());
    assert_eq!(resumed.latest_checkpoint(), Some(late.as_path()));
}

#[test]
fn test_resume_without_checkpoints() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());
    let params = note_detection_params();

    let handle = manager.prepare_at(&params, frozen_stamp()).unwrap();
    let exp_folder = handle.experiment_id().unwrap().folder_name();

    let resumed = manager.resume(&exp_folder, "run--20-03-03--15-52").unwrap();
    assert!(resumed.latest_checkpoint().is_none());
}

#[test]
fn test_resume_unknown_run_fails() {
    let tmp = TempDir::new().unwrap();
    let manager = note_detection_manager(tmp.path());

    let err = manager
        .resume("exp-11111111-22222222-33333333", "run--19-01-01--00-00")
        .unwrap_err();
    assert!(matches!(err, Error::RunNotFound(_)));
}
