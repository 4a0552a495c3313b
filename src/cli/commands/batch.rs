use crate::cli::Output;
use crate::cli::args::OptionArgs;
use crate::config::AppConfig;
use crate::formats::OutputFormat;
use crate::job::ConversionJob;
use crate::pandoc::ConversionService;
use crate::parallel::queue::clamp_concurrency;
use crate::parallel::{QueueEvent, TaskQueue};
use crate::profiles::{Profile, ProfileRepository};
use crate::scanner::{FolderScanner, ScanMode, ScanOptions};
use crate::utils::{ensure_dir_exists, format_seconds, relative_to, truncate_string};
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use crossbeam::channel::Receiver;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const ERROR_PREVIEW_CHARS: usize = 160;

#[derive(Args)]
pub struct BatchArgs {
    /// Folder to scan for documents
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Output format (defaults to the profile's, then batch.default_output_format)
    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    pub to: Option<OutputFormat>,

    /// Write converted files under this directory, mirroring the folder layout
    #[arg(short = 'd', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Conversions running at once (1-16)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Extensions to pick up, e.g. `.md,.rst`
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Only look at the folder itself, not its subfolders
    #[arg(long)]
    pub single_level: bool,

    /// Stop collecting after this many files
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// Start from a saved profile
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// List the conversions without running them
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub async fn execute(args: BatchArgs, config: &AppConfig, output: &Output) -> Result<()> {
    let profile = resolve_profile(&args, config)?;
    let mut pandoc = config.pandoc.clone();
    profile.apply_to(&mut pandoc);

    let mode = if profile.recursive {
        ScanMode::Recursive
    } else {
        ScanMode::SingleLevel
    };
    let scan_options = ScanOptions::default()
        .with_extensions(&profile.extensions)
        .with_mode(mode)
        .with_max_files(profile.max_files);
    let scan = FolderScanner::new().scan(&args.folder, &scan_options);

    for error in &scan.errors {
        output.warning(error);
    }
    if scan.files.is_empty() && !scan.success() {
        anyhow::bail!("Could not scan {}", args.folder.display());
    }
    output.verbose(&scan.to_string());
    if scan.files.is_empty() {
        output.info(&format!("No matching files found in {}", args.folder.display()));
        return Ok(());
    }

    let output_root = args.output_dir.clone().or_else(|| profile.output_dir.clone());
    let jobs: Vec<ConversionJob> = scan
        .files
        .iter()
        .map(|file| {
            let target_dir = output_root.as_deref().map(|root| mirrored_dir(root, file, &args.folder));
            profile.job_for(file, target_dir.as_deref())
        })
        .collect();

    if args.dry_run {
        output.category(&format!("{} conversions", jobs.len()));
        for job in &jobs {
            let target = job
                .output_path
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            output.list_item(&format!("{} → {}", relative_to(&job.input_path, &args.folder).display(), target));
        }
        return Ok(());
    }

    let service = ConversionService::new(pandoc.locator_config(), pandoc.runner_options());
    if !service.is_pandoc_available() {
        output.error("Pandoc is not available on this system");
        anyhow::bail!("Pandoc not found");
    }
    if let Some(root) = &output_root {
        ensure_dir_exists(root)?;
    }

    let queue = TaskQueue::with_max_concurrent(Arc::new(service), profile.max_concurrent_jobs);
    for job in jobs {
        queue.add_job(job);
    }
    let events = queue.subscribe();

    output.step(&format!(
        "Converting {} files to {} with {} workers",
        queue.len(),
        profile.output_format,
        queue.max_concurrent()
    ));
    let bar = output.progress_bar(queue.len() as u64, "starting");
    let started = Instant::now();
    queue.start();

    let mut listener = tokio::task::spawn_blocking(move || follow(events, bar));
    let interrupted = tokio::select! {
        joined = &mut listener => {
            joined.context("Progress listener stopped unexpectedly")?;
            false
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            let cancelled = queue.cancel();
            output.warning(&format!(
                "Interrupted: cancelled {cancelled} pending conversions, waiting for running ones (Ctrl-C again to quit)"
            ));
            tokio::select! {
                joined = &mut listener => {
                    joined.context("Progress listener stopped unexpectedly")?;
                }
                Ok(()) = tokio::signal::ctrl_c() => {
                    // The runtime would otherwise wait on the blocking listener
                    output.error(&format!("Aborted with {} conversions still running", queue.active_jobs()));
                    std::process::exit(130);
                }
            }
            true
        }
    };

    let summary = queue.summary();
    print_results(&queue, &args.folder, output);
    output.category("Summary");
    output.summary_stats("Converted:", summary.completed);
    output.summary_stats("Failed:", summary.failed);
    if summary.cancelled > 0 {
        output.summary_stats("Cancelled:", summary.cancelled);
    }
    output.key_value("Elapsed:", &format_seconds(started.elapsed().as_secs_f64()), false);

    if interrupted {
        anyhow::bail!("Batch interrupted");
    }
    if summary.failed > 0 {
        anyhow::bail!("{} of {} conversions failed", summary.failed, summary.total);
    }
    Ok(())
}

/// Saved profile (or the config defaults) with the command-line flags on top
fn resolve_profile(args: &BatchArgs, config: &AppConfig) -> Result<Profile> {
    let repository = ProfileRepository::new(config.profiles_dir());
    let mut profile = match &args.profile {
        Some(name) => repository
            .load(name)?
            .with_context(|| format!("Profile '{name}' not found"))?,
        None => repository.default_profile("command-line", &config.batch),
    };

    if let Some(to) = args.to {
        profile.output_format = to;
    }
    if let Some(jobs) = args.jobs {
        profile.max_concurrent_jobs = clamp_concurrency(jobs);
    }
    if !args.extensions.is_empty() {
        profile.extensions = args.extensions.clone();
    }
    if args.single_level {
        profile.recursive = false;
    }
    if let Some(max_files) = args.max_files {
        profile.max_files = max_files;
    }
    profile.options.extend(args.options.parse()?);
    Ok(profile)
}

/// `root` plus the directory of `file` relative to the scanned folder
fn mirrored_dir(root: &Path, file: &Path, folder: &Path) -> PathBuf {
    match relative_to(file, folder).parent() {
        Some(parent) if parent.is_relative() && !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    }
}

/// Drive the progress bar until the queue reports `Finished`
fn follow(events: Receiver<QueueEvent>, bar: ProgressBar) {
    for event in events.iter() {
        match event {
            QueueEvent::TaskStarted { display_name, .. } => bar.set_message(display_name),
            QueueEvent::TaskCompleted { .. } => {}
            QueueEvent::TaskFailed {
                display_name,
                error_message,
                ..
            } => bar.println(format!(
                "{} {}: {}",
                style("✖").red(),
                display_name,
                truncate_string(&error_message, ERROR_PREVIEW_CHARS)
            )),
            QueueEvent::Progress { settled, .. } => bar.set_position(settled as u64),
            QueueEvent::Finished { total, .. } => {
                bar.set_position(total as u64);
                break;
            }
        }
    }
    bar.finish_and_clear();
}

fn print_results(queue: &TaskQueue, folder: &Path, output: &Output) {
    for task in queue.completed_tasks() {
        let name = relative_to(&task.job.input_path, folder).display().to_string();
        let Some(outcome) = &task.outcome else {
            continue;
        };
        if outcome.success {
            let target = outcome
                .output_path
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            output.action_result(
                &name,
                &format!("→ {} ({})", target, format_seconds(task.duration_seconds())),
                true,
            );
        } else {
            output.error(&format!(
                "{}: {}",
                name,
                truncate_string(outcome.error_text(), ERROR_PREVIEW_CHARS)
            ));
        }
    }
}
