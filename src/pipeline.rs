//! The end-to-end selection pipeline.
//!
//! [`FrameSelector`] runs the stages in order for one video (probe, plan,
//! sample, extract, score, fingerprint, select, write) and turns the result
//! into a [`VideoReport`]. A failure is always scoped to its video: batch
//! runs keep going and report it.
//!
//! Each run owns a private scratch directory. It is a
//! [`tempfile::TempDir`], so it is removed however the run ends, including
//! errors, cancellation, and panics.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tempfile::{Builder as TempDirBuilder, TempDir};

use crate::backend::MediaBackend;
use crate::configuration::{RunOptions, SelectionConfig};
use crate::error::FrameSiftError;
use crate::extraction::extract_frames;
use crate::fingerprint::fingerprint_accepted;
use crate::output::{MAX_NAME_CHARS, frames_directory, sanitize_name, write_selection};
use crate::probe::probe_video;
use crate::progress::{OperationType, ProgressTracker};
use crate::quality::score_frames;
use crate::report::{VideoJob, VideoOutcome, VideoReport, Warning};
use crate::sampler::sample_candidates;
use crate::selection::select_diverse;

const SCRATCH_PREFIX: &str = "framesift-";

/// Selects frames from videos using one backend and one configuration.
///
/// # Example
///
/// ```no_run
/// use framesift::{FfmpegCli, FrameSelector, RunOptions, SelectionConfig, VideoJob};
///
/// let selector = FrameSelector::new(FfmpegCli::new(), SelectionConfig::default())?;
/// let report = selector.run(&VideoJob::new("holiday.mp4"), "frames", &RunOptions::new());
///
/// println!("{}: {} frames", report.outcome.label(), report.frames.len());
/// for warning in &report.warnings {
///     println!("warning: {warning}");
/// }
/// # Ok::<(), framesift::FrameSiftError>(())
/// ```
#[derive(Debug)]
pub struct FrameSelector<B> {
    backend: B,
    config: SelectionConfig,
}

impl<B: MediaBackend> FrameSelector<B> {
    /// Create a selector.
    ///
    /// # Errors
    ///
    /// Returns [`FrameSiftError::InvalidConfiguration`] if `config` fails
    /// [`SelectionConfig::validate`].
    pub fn new(backend: B, config: SelectionConfig) -> Result<Self, FrameSiftError> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    /// The media backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The selection configuration.
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Process one video, writing its frames under `output_root`.
    ///
    /// Never panics on bad input and never returns early: every failure is
    /// recorded as [`VideoOutcome::Failed`] in the report.
    pub fn run<P: AsRef<Path>>(
        &self,
        job: &VideoJob,
        output_root: P,
        options: &RunOptions,
    ) -> VideoReport {
        let started = Instant::now();
        let mut report = VideoReport::new(job.clone());

        match self.run_stages(job, output_root.as_ref(), options, &mut report) {
            Ok(()) => info!(
                "{}: {} frames from {} candidates ({})",
                job.path.display(),
                report.frames.len(),
                report.candidates,
                report.outcome.label(),
            ),
            Err(error) => {
                warn!("{}: {error}", job.path.display());
                report.outcome = VideoOutcome::Failed(error);
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    /// Process several videos, concurrently with the `rayon` feature.
    ///
    /// Returns one report per job, in job order. One video failing does not
    /// affect the others.
    ///
    /// Jobs whose names map to the same output directory are renamed with a
    /// `_2`, `_3`, ... suffix (first occurrence unchanged), so every video
    /// writes to a directory of its own. The reports carry the final names.
    pub fn run_batch<P: AsRef<Path>>(
        &self,
        jobs: &[VideoJob],
        output_root: P,
        options: &RunOptions,
    ) -> Vec<VideoReport> {
        let output_root = output_root.as_ref();
        let jobs = with_distinct_names(jobs);
        let tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Batch,
            Some(jobs.len() as u64),
            1,
        );

        let run_one = |job: &VideoJob| {
            let report = self.run(job, output_root, options);
            tracker.advance(report.duration);
            report
        };

        #[cfg(feature = "rayon")]
        let reports = jobs.par_iter().map(run_one).collect();
        #[cfg(not(feature = "rayon"))]
        let reports = jobs.iter().map(run_one).collect();

        tracker.finish();
        reports
    }

    fn run_stages(
        &self,
        job: &VideoJob,
        output_root: &Path,
        options: &RunOptions,
        report: &mut VideoReport,
    ) -> Result<(), FrameSiftError> {
        options.check_cancelled()?;

        let probing = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Probing,
            Some(1),
            1,
        );
        let video = probe_video(&self.backend, &job.path)?;
        probing.advance(Some(video.duration()));
        report.duration = Some(video.duration());

        let budget = self.config.budget_for(video.duration());
        report.budget = Some(budget);
        let candidates = sample_candidates(video.duration(), budget, &self.config);
        report.candidates = candidates.len();
        debug!(
            "{}: budget {budget}, {} candidates",
            job.path.display(),
            candidates.len()
        );

        options.check_cancelled()?;
        let scratch = create_scratch_dir(options)?;

        let extraction = extract_frames(
            &self.backend,
            &video,
            &candidates,
            scratch.path(),
            &self.config,
            options,
        )?;
        report.extracted = extraction.frames.len();
        if extraction.failed > 0 {
            let warning = Warning::PartialExtraction {
                failed: extraction.failed,
                attempted: extraction.attempted,
            };
            warn!("{}: {warning}", job.path.display());
            report.warnings.push(warning);
        }

        options.check_cancelled()?;
        let scored = score_frames(extraction.frames, &self.config, options);

        options.check_cancelled()?;
        let selecting = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Selection,
            Some(1),
            1,
        );
        let accepted = fingerprint_accepted(scored);
        report.accepted = accepted.len();
        let selection = select_diverse(accepted, budget, &self.config);
        selecting.advance(None);

        options.check_cancelled()?;
        let writing = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Writing,
            Some(selection.len() as u64),
            options.batch_size,
        );
        let frames_dir = frames_directory(output_root, &job.name);
        report.frames = write_selection(&selection, &frames_dir)?;
        report.frames_dir = Some(frames_dir);
        for (frame, path) in selection.frames().iter().zip(&report.frames) {
            debug!("Kept {:?} as {}", frame.scored.frame.timestamp, path.display());
            writing.advance(Some(frame.scored.frame.timestamp));
        }
        writing.finish();

        if selection.is_reduced_yield() {
            let warning = Warning::ReducedYield {
                selected: selection.len(),
                required: selection.required(),
            };
            warn!("{}: {warning}", job.path.display());
            report.warnings.push(warning);
            report.outcome = VideoOutcome::ReducedYield;
        }

        if let Err(error) = scratch.close() {
            warn!("Failed to remove scratch directory: {error}");
        }
        Ok(())
    }
}

/// Rename jobs so no two share an output directory.
fn with_distinct_names(jobs: &[VideoJob]) -> Vec<VideoJob> {
    let mut taken = HashSet::with_capacity(jobs.len());
    jobs.iter()
        .map(|job| {
            let base = sanitize_name(&job.name);
            if taken.insert(base.clone()) {
                return job.clone();
            }
            let renamed = (2..)
                .map(|counter| {
                    let suffix = format!("_{counter}");
                    let stem: String = base
                        .chars()
                        .take(MAX_NAME_CHARS.saturating_sub(suffix.len()))
                        .collect();
                    format!("{stem}{suffix}")
                })
                .find(|candidate| taken.insert(candidate.clone()))
                .unwrap_or_else(|| base.clone());
            warn!(
                "{}: output name {:?} already used in this batch, writing to {:?}",
                job.path.display(),
                job.name,
                renamed
            );
            job.clone().with_name(renamed)
        })
        .collect()
}

fn create_scratch_dir(options: &RunOptions) -> Result<TempDir, FrameSiftError> {
    let mut builder = TempDirBuilder::new();
    builder.prefix(SCRATCH_PREFIX);
    let scratch = match &options.scratch_root {
        Some(root) => {
            fs::create_dir_all(root)?;
            builder.tempdir_in(root)?
        }
        None => builder.tempdir()?,
    };
    debug!("Scratch directory {}", scratch.path().display());
    Ok(scratch)
}
