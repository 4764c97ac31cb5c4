//! End-to-end pipeline tests against a synthetic backend.

mod common;

use std::fs;
use std::time::Duration;

use common::{SyntheticBackend, entries, textured_scene, video_file};
use framesift::{
    FrameSelector, RunOptions, SelectionConfig, VideoJob, VideoOutcome, output_file_name,
};

/// A new scene every second.
fn per_second_scenes(duration: Duration) -> SyntheticBackend {
    SyntheticBackend::new(duration, |t| textured_scene(t.as_secs(), 20))
}

// ── Output layout ──────────────────────────────────────────────────

#[test]
fn writes_frames_under_sanitized_name() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "my:clip.mp4");
    let out = workspace.path().join("out");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(45)), SelectionConfig::default())
            .unwrap();
    let report = selector.run(&VideoJob::new(&video), &out, &RunOptions::new());

    assert!(matches!(report.outcome, VideoOutcome::Success));
    let frames_dir = out.join("my_clip_frames");
    assert_eq!(report.frames_dir.as_deref(), Some(frames_dir.as_path()));
    assert!((10..=12).contains(&report.frames.len()));
    assert_eq!(entries(&frames_dir).len(), report.frames.len());
    for path in &report.frames {
        assert!(path.starts_with(&frames_dir));
        assert!(path.is_file());
    }
}

#[test]
fn frames_are_numbered_in_timestamp_order() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "ordered.mp4");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(90)), SelectionConfig::default())
            .unwrap();
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    let names: Vec<String> = report
        .frames
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names[0].starts_with("frame_001_t"));

    let millis: Vec<u64> = names
        .iter()
        .map(|name| {
            let digits = name.split("_t").nth(1).unwrap().trim_end_matches("ms.jpg");
            digits.parse().unwrap()
        })
        .collect();
    assert!(millis.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(
        names[0],
        output_file_name(1, Duration::from_millis(millis[0]))
    );
}

#[test]
fn report_counts_each_stage() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "counts.mp4");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(20)), SelectionConfig::default())
            .unwrap();
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    assert_eq!(report.duration, Some(Duration::from_secs(20)));
    let budget = report.budget.unwrap();
    assert_eq!((budget.min(), budget.max()), (10, 10));
    assert_eq!(report.candidates, 40);
    assert_eq!(report.extracted, 40);
    assert_eq!(report.accepted, 40);
    assert_eq!(report.frames.len(), 10);
    assert!(report.warnings.is_empty());
}

#[test]
fn custom_job_name_controls_directory() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "raw.mp4");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(20)), SelectionConfig::default())
            .unwrap();
    let job = VideoJob::new(&video).with_name("lecture 01");
    let report = selector.run(&job, workspace.path(), &RunOptions::new());

    assert!(report.outcome.is_completed());
    assert!(workspace.path().join("lecture 01_frames").is_dir());
}

#[test]
fn max_frames_override_bounds_selection() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "short.mp4");

    let config = SelectionConfig::default().with_max_frames(4);
    let selector = FrameSelector::new(per_second_scenes(Duration::from_secs(200)), config).unwrap();
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    assert!(matches!(report.outcome, VideoOutcome::Success));
    assert_eq!(report.frames.len(), 4);
}

// ── Idempotence ────────────────────────────────────────────────────

#[test]
fn repeated_runs_produce_identical_output() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "again.mp4");
    let out = workspace.path().join("out");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(75)), SelectionConfig::default())
            .unwrap();
    let job = VideoJob::new(&video);

    let first = selector.run(&job, &out, &RunOptions::new());
    let first_bytes: Vec<Vec<u8>> = first.frames.iter().map(|p| fs::read(p).unwrap()).collect();

    let second = selector.run(&job, &out, &RunOptions::new());
    let second_bytes: Vec<Vec<u8>> = second.frames.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first.frames, second.frames);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(entries(&out.join("again_frames")).len(), second.frames.len());
}

#[test]
fn stale_frames_from_a_larger_run_are_removed() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "shrink.mp4");
    let out = workspace.path().join("out");
    let job = VideoJob::new(&video);
    let backend = || per_second_scenes(Duration::from_secs(700));

    let large = FrameSelector::new(backend(), SelectionConfig::default())
        .unwrap()
        .run(&job, &out, &RunOptions::new());
    let small = FrameSelector::new(backend(), SelectionConfig::default().with_max_frames(3))
        .unwrap()
        .run(&job, &out, &RunOptions::new());

    assert!(large.frames.len() > small.frames.len());
    assert_eq!(entries(&out.join("shrink_frames")).len(), 3);
}

#[test]
fn unrelated_files_in_frames_dir_survive() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "keep.mp4");
    let frames_dir = workspace.path().join("keep_frames");
    fs::create_dir_all(&frames_dir).unwrap();
    fs::write(frames_dir.join("notes.txt"), "mine").unwrap();

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(20)), SelectionConfig::default())
            .unwrap();
    selector.run(&VideoJob::new(&video), workspace.path(), &RunOptions::new());

    assert_eq!(fs::read_to_string(frames_dir.join("notes.txt")).unwrap(), "mine");
}

// ── Scratch cleanup ────────────────────────────────────────────────

#[test]
fn scratch_is_removed_after_success() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "clean.mp4");
    let scratch = workspace.path().join("scratch");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(30)), SelectionConfig::default())
            .unwrap();
    let options = RunOptions::new().with_scratch_root(&scratch);
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &options);

    assert!(report.outcome.is_completed());
    assert!(entries(&scratch).is_empty());
}

#[test]
fn scratch_is_removed_after_failure() {
    let workspace = tempfile::tempdir().unwrap();
    let video = video_file(workspace.path(), "broken.mp4");
    let scratch = workspace.path().join("scratch");

    let backend = per_second_scenes(Duration::from_secs(30)).failing_everywhere();
    let selector = FrameSelector::new(backend, SelectionConfig::default()).unwrap();
    let options = RunOptions::new().with_scratch_root(&scratch);
    let report = selector.run(&VideoJob::new(&video), workspace.path(), &options);

    assert!(matches!(report.outcome, VideoOutcome::Failed(_)));
    assert!(entries(&scratch).is_empty());
}

// ── Batch ──────────────────────────────────────────────────────────

#[test]
fn batch_reports_in_job_order() {
    let workspace = tempfile::tempdir().unwrap();
    let jobs: Vec<VideoJob> = ["a.mp4", "b.mp4", "c.mp4"]
        .iter()
        .map(|name| VideoJob::new(video_file(workspace.path(), name)))
        .collect();

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(40)), SelectionConfig::default())
            .unwrap();
    let reports = selector.run_batch(&jobs, workspace.path(), &RunOptions::new());

    let names: Vec<&str> = reports.iter().map(|r| r.job.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    for name in names {
        assert!(workspace.path().join(format!("{name}_frames")).is_dir());
    }
}

#[test]
fn batch_jobs_with_the_same_stem_keep_separate_outputs() {
    let workspace = tempfile::tempdir().unwrap();
    let jobs: Vec<VideoJob> = ["a", "b"]
        .iter()
        .map(|folder| {
            let directory = workspace.path().join(folder);
            fs::create_dir_all(&directory).unwrap();
            VideoJob::new(video_file(&directory, "clip.mp4"))
        })
        .collect();
    let out = workspace.path().join("out");

    let selector =
        FrameSelector::new(per_second_scenes(Duration::from_secs(120)), SelectionConfig::default())
            .unwrap();
    let reports = selector.run_batch(&jobs, &out, &RunOptions::new());

    let names: Vec<&str> = reports.iter().map(|r| r.job.name.as_str()).collect();
    assert_eq!(names, ["clip", "clip_2"]);
    assert_eq!(reports[0].job.path, jobs[0].path);
    assert_eq!(reports[1].job.path, jobs[1].path);

    for (report, directory) in reports.iter().zip(["clip_frames", "clip_2_frames"]) {
        assert!(matches!(report.outcome, VideoOutcome::Success));
        let frames_dir = out.join(directory);
        assert_eq!(report.frames_dir.as_deref(), Some(frames_dir.as_path()));
        assert_eq!(entries(&frames_dir).len(), report.frames.len());
        assert!(report.frames.iter().all(|path| path.is_file()));
    }
}
