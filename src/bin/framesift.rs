use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesift::{
    FfmpegCli, FrameSelector, MediaBackend, OperationType, ProgressCallback, ProgressInfo,
    RunOptions, SelectionConfig, VideoJob, VideoOutcome, VideoReport, probe_video,
    sample_candidates,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};

const CLI_AFTER_HELP: &str = "Examples:\n  framesift select input.mp4 --out frames\n  framesift select input.mp4 --out frames --max-frames 15 --progress --json\n  framesift batch clips/*.mp4 --out frames --threads 4\n  framesift probe input.mp4\n  framesift plan 00:04:30\n  framesift completions zsh > _framesift";

#[derive(Debug, Parser)]
#[command(
    name = "framesift",
    version,
    about = "Select a small, sharp, visually diverse set of frames from videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Worker thread count for parallel extraction and batches.
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Path to the ffmpeg executable.
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Path to the ffprobe executable.
    #[arg(long, global = true, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Seconds before a single frame decode is abandoned.
    #[arg(long, global = true, default_value_t = 60.0)]
    decode_timeout: f64,

    /// Seconds before a duration probe is abandoned.
    #[arg(long, global = true, default_value_t = 30.0)]
    probe_timeout: f64,

    /// Directory for temporary candidate frames (default: system temp dir).
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Decode in-process with the FFmpeg libraries instead of the executables.
    #[arg(long, global = true)]
    native: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Select frames from one video.
    #[command(
        about = "Select frames from one video",
        after_help = "Examples:\n  framesift select input.mp4 --out frames\n  framesift select input.mp4 --out frames --name holiday --max-frames 20"
    )]
    Select {
        /// Input video path.
        input: PathBuf,
        /// Output root; frames go to <out>/<name>_frames/.
        #[arg(long)]
        out: PathBuf,
        /// Name for the output directory (default: file stem).
        #[arg(long)]
        name: Option<String>,
        /// Upper bound on selected frames (1-60).
        #[arg(long)]
        max_frames: Option<u32>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Select frames from several videos.
    #[command(
        about = "Select frames from several videos",
        after_help = "Examples:\n  framesift batch a.mp4 b.mkv --out frames\n  framesift batch clips/*.mp4 --out frames --json"
    )]
    Batch {
        /// Input video paths.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output root; each video gets its own <name>_frames/ directory.
        #[arg(long)]
        out: PathBuf,
        /// Upper bound on selected frames per video (1-60).
        #[arg(long)]
        max_frames: Option<u32>,
        /// Print the reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the duration, frame budget, and candidate count of a video.
    #[command(about = "Probe a video and show its plan")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the frame budget and candidate plan for a duration.
    #[command(
        about = "Show the plan for a duration",
        after_help = "Examples:\n  framesift plan 45\n  framesift plan 00:12:30 --max-frames 40"
    )]
    Plan {
        /// Duration as seconds, MM:SS, or HH:MM:SS.
        duration: String,
        /// Upper bound on selected frames (1-60).
        #[arg(long)]
        max_frames: Option<u32>,
    },

    /// Generate shell completions.
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate for.
        shell: Shell,
    },
}

/// Drives an indicatif bar from pipeline progress reports.
struct TerminalProgress {
    bar: ProgressBar,
    only: Option<OperationType>,
}

impl TerminalProgress {
    fn new(only: Option<OperationType>) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar, only })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if self.only.is_some_and(|operation| operation != info.operation) {
            return;
        }
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(stage_label(info.operation));
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn stage_label(operation: OperationType) -> &'static str {
    match operation {
        OperationType::Probing => "probing",
        OperationType::Extraction => "extracting",
        OperationType::Scoring => "scoring",
        OperationType::Selection => "selecting",
        OperationType::Writing => "writing",
        OperationType::Batch => "videos",
        _ => "working",
    }
}

fn parse_timecode(input: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = input.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(format!("duration must be positive: {trimmed}").into());
        }
        return to_duration(seconds, trimmed);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    if !total_seconds.is_finite() || total_seconds <= 0.0 {
        return Err(format!("duration must be positive: {trimmed}").into());
    }
    to_duration(total_seconds, trimmed)
}

fn to_duration(seconds: f64, input: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("duration out of range: {input}").into())
}

fn parse_timeout(seconds: f64, flag: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("{flag} must be a positive number of seconds").into());
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("{flag} is out of range: {seconds}").into())
}

fn apply_global_options(global: &GlobalOptions) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Some(threads) = global.threads {
        if threads > 0 {
            // SAFETY: set before any worker thread is started.
            unsafe {
                std::env::set_var("RAYON_NUM_THREADS", threads.to_string());
            }
        }
    }

    #[cfg(not(feature = "native"))]
    if global.native {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--native requires building with the `native` feature; using the ffmpeg executables"
                .yellow()
        );
    }
}

fn build_backend(
    global: &GlobalOptions,
) -> Result<Box<dyn MediaBackend>, Box<dyn std::error::Error>> {
    let decode_timeout = parse_timeout(global.decode_timeout, "--decode-timeout")?;
    let probe_timeout = parse_timeout(global.probe_timeout, "--probe-timeout")?;

    #[cfg(feature = "native")]
    if global.native {
        let backend = framesift::NativeBackend::new()?
            .with_decode_timeout(decode_timeout)
            .with_probe_timeout(probe_timeout);
        return Ok(Box::new(backend));
    }

    let backend = FfmpegCli::new()
        .with_ffmpeg(&global.ffmpeg)
        .with_ffprobe(&global.ffprobe)
        .with_decode_timeout(decode_timeout)
        .with_probe_timeout(probe_timeout);
    backend.check_available()?;
    Ok(Box::new(backend))
}

fn selection_config(max_frames: Option<u32>) -> SelectionConfig {
    let config = SelectionConfig::default();
    match max_frames {
        Some(frames) => config.with_max_frames(frames),
        None => config,
    }
}

fn run_options(
    global: &GlobalOptions,
    only: Option<OperationType>,
) -> Result<RunOptions, Box<dyn std::error::Error>> {
    let mut options = RunOptions::new();
    if let Some(root) = &global.scratch_dir {
        options = options.with_scratch_root(root);
    }
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new(only)?));
    }
    Ok(options)
}

fn report_json(report: &VideoReport) -> Value {
    json!({
        "input": report.job.path.display().to_string(),
        "name": report.job.name,
        "outcome": report.outcome.label(),
        "error": report.outcome.error().map(|error| error.to_string()),
        "duration_seconds": report.duration.map(|duration| duration.as_secs_f64()),
        "budget": report.budget.map(|budget| json!({ "min": budget.min(), "max": budget.max() })),
        "candidates": report.candidates,
        "extracted": report.extracted,
        "accepted": report.accepted,
        "frames_dir": report.frames_dir.as_ref().map(|dir| dir.display().to_string()),
        "frames": report.frames.iter().map(|path| path.display().to_string()).collect::<Vec<_>>(),
        "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "elapsed_seconds": report.elapsed.as_secs_f64(),
    })
}

fn print_report(report: &VideoReport, verbose: bool) {
    for warning in &report.warnings {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{}: {warning}", report.job.path.display()).yellow()
        );
    }

    match &report.outcome {
        VideoOutcome::Failed(error) => {
            eprintln!(
                "{} {}: {error}",
                "failed:".red().bold(),
                report.job.path.display()
            );
        }
        outcome => {
            let directory = report
                .frames_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default();
            println!(
                "{} {} frames from {} ({}, {:.1}s) -> {}",
                "success:".green().bold(),
                report.frames.len(),
                report.job.path.display(),
                outcome.label(),
                report.elapsed.as_secs_f64(),
                directory,
            );
            if verbose {
                for path in &report.frames {
                    println!("  {}", path.display());
                }
            }
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global);

    match cli.command {
        Commands::Select {
            input,
            out,
            name,
            max_frames,
            json,
        } => {
            let selector =
                FrameSelector::new(build_backend(&cli.global)?, selection_config(max_frames))?;
            let mut job = VideoJob::new(&input);
            if let Some(name) = name {
                job = job.with_name(name);
            }
            let options = run_options(&cli.global, None)?;
            let report = selector.run(&job, &out, &options);
            drop(options);

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                print_report(&report, cli.global.verbose);
            }
            if let VideoOutcome::Failed(error) = report.outcome {
                return Err(error.into());
            }
        }
        Commands::Batch {
            inputs,
            out,
            max_frames,
            json,
        } => {
            let selector =
                FrameSelector::new(build_backend(&cli.global)?, selection_config(max_frames))?;
            let jobs: Vec<VideoJob> = inputs.iter().map(VideoJob::new).collect();
            let options = run_options(&cli.global, Some(OperationType::Batch))?;
            let reports = selector.run_batch(&jobs, &out, &options);
            drop(options);

            if json {
                let payload: Vec<Value> = reports.iter().map(report_json).collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for report in &reports {
                    print_report(report, cli.global.verbose);
                }
            }

            let failed = reports
                .iter()
                .filter(|report| !report.outcome.is_completed())
                .count();
            if failed > 0 {
                return Err(format!("{failed} of {} videos failed", reports.len()).into());
            }
        }
        Commands::Probe { input, json } => {
            let backend = build_backend(&cli.global)?;
            let config = SelectionConfig::default();
            let video = probe_video(&backend, &input)?;
            let budget = config.budget_for(video.duration());
            let candidates = sample_candidates(video.duration(), budget, &config);

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "duration_seconds": video.duration().as_secs_f64(),
                    "budget": { "min": budget.min(), "max": budget.max() },
                    "candidates": candidates.len(),
                    "min_spacing_ms": candidates.min_spacing().as_millis() as u64,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Duration: {:.3}s", video.duration().as_secs_f64());
                println!("Budget: {budget} frames");
                println!("Candidates: {}", candidates.len());
            }
        }
        Commands::Plan {
            duration,
            max_frames,
        } => {
            let duration = parse_timecode(&duration)?;
            let config = selection_config(max_frames);
            let budget = config.budget_for(duration);
            let candidates = sample_candidates(duration, budget, &config);
            println!("Budget: {budget} frames");
            println!(
                "Candidates: {} (spacing >= {}ms)",
                candidates.len(),
                candidates.min_spacing().as_millis()
            );
            if cli.global.verbose {
                for timestamp in &candidates {
                    println!("  {:.3}s", timestamp.as_secs_f64());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesift", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
