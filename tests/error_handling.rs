//! Error handling integration tests.
//!
//! Failures must stay scoped to a single video and surface as structured
//! errors in its report.

mod common;

use std::error::Error;
use std::fs;
use std::time::Duration;

use common::{SyntheticBackend, textured_scene, video_file};
use framesift::{
    BackendError, FfmpegCli, FrameSelector, FrameSiftError, RunOptions, SelectionConfig,
    VideoJob, VideoOutcome, probe_video,
};

fn healthy(duration: Duration) -> SyntheticBackend {
    SyntheticBackend::new(duration, |t| textured_scene(t.as_secs(), 20))
}

// ── Configuration ──────────────────────────────────────────────────

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let config = SelectionConfig::default().with_oversampling(1);
    let result = FrameSelector::new(healthy(Duration::from_secs(10)), config);
    assert!(matches!(
        result,
        Err(FrameSiftError::InvalidConfiguration(_))
    ));
}

#[test]
fn inverted_brightness_window_is_rejected() {
    let config = SelectionConfig::default().with_brightness_window(0.9, 0.1);
    let error = config.validate().unwrap_err();
    assert!(error.to_string().starts_with("Invalid configuration"));
}

// ── Probe ──────────────────────────────────────────────────────────

#[test]
fn missing_file_fails_before_backend() {
    let workspace = tempfile::tempdir().unwrap();
    let backend = healthy(Duration::from_secs(10));
    let missing = workspace.path().join("nope.mp4");

    let report = FrameSelector::new(&backend, SelectionConfig::default())
        .unwrap()
        .run(&VideoJob::new(&missing), workspace.path(), &RunOptions::new());

    match report.outcome.error() {
        Some(FrameSiftError::Probe { path, .. }) => assert_eq!(path, &missing),
        other => panic!("expected probe error, got {other:?}"),
    }
    assert_eq!(backend.decode_calls(), 0);
    assert!(report.frames_dir.is_none());
    assert!(!workspace.path().join("nope_frames").exists());
}

#[test]
fn probe_failure_carries_backend_source() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "corrupt.mp4");

    let selector = FrameSelector::new(
        SyntheticBackend::unprobeable("moov atom not found"),
        SelectionConfig::default(),
    )
    .unwrap();
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    let error = report.outcome.error().unwrap();
    assert!(matches!(error, FrameSiftError::Probe { .. }));
    let source = error.source().unwrap();
    assert!(source.to_string().contains("moov atom not found"));
    assert!(report.duration.is_none());
}

#[test]
fn zero_duration_is_a_probe_failure() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "empty.mp4");

    let result = probe_video(&healthy(Duration::ZERO), &video);
    assert!(matches!(result, Err(FrameSiftError::Probe { .. })));
}

#[test]
fn missing_ffprobe_is_reported_as_unavailable() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "clip.mp4");
    let backend = FfmpegCli::new().with_ffprobe("framesift-test-no-such-ffprobe");

    match probe_video(&backend, &video) {
        Err(FrameSiftError::Probe {
            source: BackendError::Unavailable { program, .. },
            ..
        }) => assert_eq!(program, "framesift-test-no-such-ffprobe"),
        other => panic!("expected unavailable backend, got {other:?}"),
    }
}

// ── Extraction ─────────────────────────────────────────────────────

#[test]
fn all_candidates_failing_is_an_extraction_error() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "undecodable.mp4");

    let backend = healthy(Duration::from_secs(20)).failing_everywhere();
    let selector = FrameSelector::new(backend, SelectionConfig::default()).unwrap();
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    match report.outcome.error() {
        Some(FrameSiftError::Extraction { path, attempted }) => {
            assert_eq!(path, &video);
            assert_eq!(*attempted, 40);
        }
        other => panic!("expected extraction error, got {other:?}"),
    }
    assert_eq!(report.candidates, 40);
    assert!(report.frames.is_empty());
    assert!(!workspace.path().join("undecodable_frames").exists());
}

// ── Output ─────────────────────────────────────────────────────────

#[test]
fn unwritable_output_is_a_write_error() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "clip.mp4");
    let blocker = workspace.path().join("not-a-directory");
    fs::write(&blocker, "file").unwrap();

    let selector =
        FrameSelector::new(healthy(Duration::from_secs(20)), SelectionConfig::default()).unwrap();
    let report = selector.run(&VideoJob::new(&video), &blocker, &RunOptions::new());

    assert!(matches!(
        report.outcome.error(),
        Some(FrameSiftError::Write { .. })
    ));
    assert_eq!(report.outcome.label(), "failed");
}

// ── Batch isolation ────────────────────────────────────────────────

#[test]
fn one_failing_video_does_not_stop_the_batch() {
    let workspace = tempfile::tempdir().unwrap();
    let jobs = vec![
        VideoJob::new(video_file(workspace.path(), "first.mp4")),
        VideoJob::new(workspace.path().join("missing.mp4")),
        VideoJob::new(video_file(workspace.path(), "third.mp4")),
    ];

    let selector =
        FrameSelector::new(healthy(Duration::from_secs(20)), SelectionConfig::default()).unwrap();
    let reports = selector.run_batch(&jobs, workspace.path(), &RunOptions::new());

    let labels: Vec<&str> = reports.iter().map(|r| r.outcome.label()).collect();
    assert_eq!(labels, ["success", "failed", "success"]);
    assert_eq!(reports[0].frames.len(), 10);
    assert_eq!(reports[2].frames.len(), 10);
}
