//! Conversion façade over the locator and runner

use super::locator::{LocatorConfig, PandocInfo, PandocLocator};
use super::runner::{PandocRunner, RunnerOptions};
use crate::error::ConversionError;
use crate::job::{ConversionJob, ConversionOutcome};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Extensions pandoc reads without any hint
const COMMON_INPUT_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "txt", "html", "docx", "odt"];

/// Anything that turns a job into an outcome
///
/// The task queue only depends on this, which keeps it testable without pandoc.
pub trait Converter: Send + Sync {
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome;
}

impl<F> Converter for F
where
    F: Fn(&ConversionJob) -> ConversionOutcome + Send + Sync,
{
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        self(job)
    }
}

/// Detects pandoc once and runs conversions through it
pub struct ConversionService {
    locator: PandocLocator,
    runner_options: RunnerOptions,
    runner: Mutex<Option<Arc<PandocRunner>>>,
}

impl Default for ConversionService {
    fn default() -> Self {
        Self::new(LocatorConfig::default(), RunnerOptions::default())
    }
}

impl ConversionService {
    pub fn new(locator_config: LocatorConfig, runner_options: RunnerOptions) -> Self {
        Self {
            locator: PandocLocator::new(locator_config),
            runner_options,
            runner: Mutex::new(None),
        }
    }

    pub fn is_pandoc_available(&self) -> bool {
        self.locator.is_available()
    }

    pub fn get_pandoc_info(&self) -> PandocInfo {
        self.locator.detect()
    }

    pub fn runner_options(&self) -> &RunnerOptions {
        &self.runner_options
    }

    /// Runner bound to the detected executable, built on first use
    pub fn runner(&self) -> Result<Arc<PandocRunner>, ConversionError> {
        let mut slot = self.runner.lock();
        if let Some(runner) = slot.as_ref() {
            return Ok(Arc::clone(runner));
        }

        let info = self.locator.detect();
        if !info.available {
            return Err(ConversionError::ToolUnavailable);
        }

        let runner = Arc::new(PandocRunner::with_options(info.path, self.runner_options.clone()));
        *slot = Some(Arc::clone(&runner));
        Ok(runner)
    }

    /// Command line the job would run, without running it
    pub fn preview(&self, job: &ConversionJob) -> Result<String, ConversionError> {
        Ok(self.runner()?.render_command(job))
    }

    /// Exists and is a regular file; unfamiliar extensions are left for pandoc to judge
    pub fn validate_input_file(&self, path: &Path) -> bool {
        if !path.exists() {
            warn!("Input file does not exist: {}", path.display());
            return false;
        }
        if !path.is_file() {
            warn!("Input path is not a file: {}", path.display());
            return false;
        }

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !COMMON_INPUT_EXTENSIONS.contains(&extension.as_str()) {
            warn!("File extension may not be supported: .{}", extension);
        }
        true
    }

    /// Forget the detected executable and the runner bound to it
    pub fn refresh_detection(&self) {
        self.locator.clear_cache();
        *self.runner.lock() = None;
        info!("Pandoc detection cache cleared");
    }
}

impl Converter for ConversionService {
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        info!("Starting conversion: {} -> {}", job.input_path.display(), job.output_format);

        let attempt = catch_unwind(AssertUnwindSafe(|| {
            let runner = self.runner()?;
            Ok::<_, ConversionError>(runner.execute(job))
        }));

        match attempt {
            Ok(Ok(outcome)) => {
                if outcome.success {
                    info!("Conversion completed successfully in {:.2}s", outcome.duration_seconds);
                } else {
                    error!("Conversion failed: {}", outcome.error_text());
                }
                outcome
            }
            Ok(Err(e)) => {
                error!("Conversion service error: {}", e);
                ConversionOutcome::failed(&ConversionError::Service(e.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Conversion service error: {}", message);
                ConversionOutcome::failed(&ConversionError::Service(message))
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unexpected panic".to_string()
    }
}
