//! Command construction and execution for a single conversion

use super::process::{ProcessResult, run_with_timeout};
use crate::error::ConversionError;
use crate::formats::OutputFormat;
use crate::job::{ConversionJob, ConversionOutcome};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_PDF_ENGINE: &str = "pdflatex";

/// Characters of stdout/stderr echoed at debug level
const LOG_EXCERPT_CHARS: usize = 200;

/// Knobs that shape every command the runner builds
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    pub timeout: Duration,
    pub pdf_engine: String,
    pub html_standalone: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            pdf_engine: DEFAULT_PDF_ENGINE.to_string(),
            html_standalone: true,
        }
    }
}

/// Runs pandoc at a fixed path
#[derive(Debug, Clone)]
pub struct PandocRunner {
    executable: PathBuf,
    options: RunnerOptions,
}

impl PandocRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self::with_options(executable, RunnerOptions::default())
    }

    pub fn with_options(executable: impl Into<PathBuf>, options: RunnerOptions) -> Self {
        Self {
            executable: executable.into(),
            options,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// `[exe, (-f in)?, input, -t out, (-o output)?, format defaults…, options…]`
    pub fn build_command(&self, job: &ConversionJob) -> Vec<OsString> {
        let mut cmd: Vec<OsString> = vec![self.executable.clone().into_os_string()];

        if let Some(input_format) = job.input_format {
            cmd.push("-f".into());
            cmd.push(input_format.as_str().into());
        }

        cmd.push(job.input_path.clone().into_os_string());
        cmd.push("-t".into());
        cmd.push(job.output_format.as_str().into());

        if let Some(output_path) = &job.output_path {
            cmd.push("-o".into());
            cmd.push(output_path.clone().into_os_string());
        }

        match job.output_format {
            OutputFormat::Pdf => {
                cmd.push("--pdf-engine".into());
                cmd.push(self.options.pdf_engine.clone().into());
            }
            OutputFormat::Html if self.options.html_standalone => cmd.push("--standalone".into()),
            _ => {}
        }

        // BTreeMap keeps flag order stable across runs
        for (key, value) in &job.options {
            if !value.is_enabled() {
                continue;
            }
            cmd.push(format!("--{key}").into());
            if let Some(rendered) = value.render() {
                cmd.push(rendered.into());
            }
        }

        cmd
    }

    /// Command line as a single string, quoting arguments that contain whitespace
    pub fn render_command(&self, job: &ConversionJob) -> String {
        render_args(&self.build_command(job))
    }

    /// Run one conversion. Every failure is folded into the outcome.
    pub fn execute(&self, job: &ConversionJob) -> ConversionOutcome {
        let started = Instant::now();
        let fail = |err: ConversionError| {
            error!("Pandoc conversion failed: {}", err);
            ConversionOutcome::failed(&err).with_duration(started.elapsed().as_secs_f64())
        };

        if !job.input_path.exists() {
            return fail(ConversionError::InputMissing(job.input_path.clone()));
        }
        if !self.executable.exists() {
            return fail(ConversionError::ExecutableMissing(self.executable.clone()));
        }
        if let Some(parent) = job.output_path.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return fail(ConversionError::Spawn(e));
                }
            }
        }

        let args = self.build_command(job);
        let command = render_args(&args);
        info!("Executing pandoc command: {}", command);

        let (program, rest) = match args.split_first() {
            Some(split) => split,
            None => return fail(ConversionError::Service("empty command line".to_string())),
        };

        match run_with_timeout(program, rest, self.options.timeout) {
            Ok(ProcessResult::Exited(output)) => {
                let duration = started.elapsed().as_secs_f64();
                debug!("Pandoc exit status: {}", output.status);
                debug!("Pandoc stdout: {}", excerpt(&output.stdout));
                debug!("Pandoc stderr: {}", excerpt(&output.stderr));

                if output.success() {
                    info!("Pandoc conversion successful in {:.2}s", duration);
                    ConversionOutcome::succeeded(job.output_path.clone(), duration, command)
                } else {
                    let stderr = output.stderr.trim();
                    let message = if stderr.is_empty() {
                        "Unknown pandoc error".to_string()
                    } else {
                        stderr.to_string()
                    };
                    fail(ConversionError::ExecutionFailed(message)).with_command(command)
                }
            }
            Ok(ProcessResult::TimedOut { .. }) => {
                fail(ConversionError::TimedOut(self.options.timeout)).with_command(command)
            }
            Err(e) => fail(ConversionError::Spawn(e)).with_command(command),
        }
    }
}

pub(crate) fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.chars().any(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_EXCERPT_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}
