// Drives the compiled binary end to end: frames in, summary out, workout stored.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use repcount::landmark::{FrameRecord, LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST};
use repcount::store::WorkoutStore;
use repcount::{Landmark, LandmarkFrame, SessionSummary};
use tempfile::tempdir;

fn arm_line(t: u64, degrees: f64) -> String {
    let rad = degrees.to_radians();
    let frame = LandmarkFrame::new(
        t,
        vec![
            Landmark::new(LEFT_SHOULDER, 0.3, 0.5, 0.9),
            Landmark::new(LEFT_ELBOW, 0.5, 0.5, 0.9),
            Landmark::new(LEFT_WRIST, 0.5 - 0.2 * rad.cos(), 0.5 + 0.2 * rad.sin(), 0.9),
        ],
    );
    serde_json::to_string(&FrameRecord::from(&frame)).unwrap()
}

fn frames(points: &[(u64, f64)]) -> String {
    points
        .iter()
        .map(|&(t, deg)| arm_line(t, deg) + "\n")
        .collect()
}

fn repcount(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("repcount").unwrap();
    cmd.env("HOME", dir)
        .env("RUST_LOG", "off")
        .arg("--config")
        .arg(dir.join("config.json"))
        .arg("--db")
        .arg(dir.join("workouts.db"));
    cmd
}

#[test]
fn run_counts_reps_and_stores_workout() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("frames.jsonl");
    fs::write(
        &input,
        frames(&[(0, 170.0), (900, 80.0), (1800, 170.0), (2700, 85.0), (3600, 172.0)]),
    )
    .unwrap();

    let output = repcount(dir.path())
        .args(["run", "-e", "pushup", "--json", "-i"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    // two rep events, one per line, then the pretty summary
    let summary_start = stdout.find("{\n").unwrap();
    let summary: SessionSummary = serde_json::from_str(&stdout[summary_start..]).unwrap();
    assert_eq!(summary.exercise, "pushup");
    assert_eq!(summary.rep_count, 2);
    assert_eq!(stdout[..summary_start].lines().count(), 2);

    let store = WorkoutStore::open(dir.path().join("workouts.db")).unwrap();
    let rows = store.recent(5).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rep_count, 2);
}

#[test]
fn run_reads_stdin_and_prints_text_summary() {
    let dir = tempdir().unwrap();

    let output = repcount(dir.path())
        .args(["run", "-e", "pushup", "--no-save"])
        .write_stdin(frames(&[(0, 170.0), (1000, 80.0), (2000, 170.0)]))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("rep   1  accuracy 100%  left_elbow=170"));
    assert!(stdout.contains("reps       1"));
    assert!(stdout.contains("duration   0:02"));

    assert!(!dir.path().join("workouts.db").exists());
}

#[test]
fn run_without_reps_fails_and_saves_nothing() {
    let dir = tempdir().unwrap();

    repcount(dir.path())
        .args(["run", "-e", "pushup"])
        .write_stdin(frames(&[(0, 170.0), (300, 80.0)]))
        .assert()
        .failure();

    let store = WorkoutStore::open(dir.path().join("workouts.db")).unwrap();
    assert!(store.recent(5).unwrap().is_empty());
}

#[test]
fn run_rejects_unknown_exercise() {
    let dir = tempdir().unwrap();

    repcount(dir.path())
        .args(["run", "-e", "burpee"])
        .write_stdin(frames(&[(0, 170.0)]))
        .assert()
        .failure();
}

#[test]
fn dwell_override_changes_debounce() {
    let dir = tempdir().unwrap();
    // changes 300ms apart are only honoured with a shorter dwell
    let input = frames(&[(0, 170.0), (300, 80.0), (600, 170.0)]);

    repcount(dir.path())
        .args(["run", "-e", "pushup", "--no-save", "--dwell-ms", "200"])
        .write_stdin(input.clone())
        .assert()
        .success();

    repcount(dir.path())
        .args(["run", "-e", "pushup", "--no-save"])
        .write_stdin(input)
        .assert()
        .failure();
}

#[test]
fn dwell_override_reaches_custom_profile() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"profiles": [{"id": "curl", "name": "Bicep curls",
            "angles": [{"name": "left_elbow", "first": 11, "vertex": 13, "third": 15}]}]}"#,
    )
    .unwrap();
    let input = frames(&[(0, 170.0), (300, 80.0), (600, 170.0)]);

    let output = repcount(dir.path())
        .args(["run", "-e", "curl", "--no-save", "--json", "--dwell-ms", "200"])
        .write_stdin(input.clone())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let summary_start = stdout.find("{\n").unwrap();
    let summary: SessionSummary = serde_json::from_str(&stdout[summary_start..]).unwrap();
    assert_eq!(summary.exercise, "curl");
    assert_eq!(summary.rep_count, 1);

    // the profile's own 800ms dwell swallows the same motion
    repcount(dir.path())
        .args(["run", "-e", "curl", "--no-save"])
        .write_stdin(input)
        .assert()
        .failure();
}

#[test]
fn custom_profile_from_config_is_listed() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"profiles": [{"id": "curl", "name": "Bicep curls",
            "angles": [{"name": "left_elbow", "first": 11, "vertex": 13, "third": 15}]}]}"#,
    )
    .unwrap();

    let output = repcount(dir.path()).arg("profiles").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("curl"));
    assert!(stdout.contains("Bicep curls"));
    assert!(stdout.contains("squat"));
}

#[test]
fn history_reports_saved_workouts() {
    let dir = tempdir().unwrap();
    repcount(dir.path())
        .args(["run", "-e", "pushup"])
        .write_stdin(frames(&[(0, 170.0), (1000, 80.0), (2000, 170.0)]))
        .assert()
        .success();

    let output = repcount(dir.path()).arg("history").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("1 workouts, 1 reps"));
    assert!(stdout.contains("pushup"));
}

