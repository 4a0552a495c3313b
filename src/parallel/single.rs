//! One conversion on a dedicated background thread
//!
//! Used by the non-batch path: the caller keeps its own thread free and follows
//! along through [`WorkerEvent`]s.

use crate::job::{ConversionJob, ConversionOutcome};
use crate::pandoc::service::panic_message;
use crate::pandoc::{ConversionService, Converter};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Percentage milestones: 10, 25, 40, 50, 90, 100
    Progress(u8),
    Status(String),
    Log(String),
    /// Always the last event
    Finished(ConversionOutcome),
}

pub struct SingleConversion {
    events: Receiver<WorkerEvent>,
    handle: JoinHandle<ConversionOutcome>,
}

impl SingleConversion {
    pub fn spawn(service: Arc<ConversionService>, job: ConversionJob) -> std::io::Result<Self> {
        let (tx, events) = unbounded();
        let handle = thread::Builder::new()
            .name("pandoc-batch-single".to_string())
            .spawn(move || {
                let reporter = Reporter { tx };
                let outcome = catch_unwind(AssertUnwindSafe(|| run(&service, &job, &reporter))).unwrap_or_else(|panic| {
                    let message = format!("Worker thread error: {}", panic_message(panic.as_ref()));
                    reporter.log(&message);
                    reporter.status("Conversion failed");
                    failure(message)
                });
                reporter.send(WorkerEvent::Finished(outcome.clone()));
                outcome
            })?;
        Ok(Self { events, handle })
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the conversion is done
    pub fn wait(self) -> ConversionOutcome {
        self.handle
            .join()
            .unwrap_or_else(|panic| failure(format!("Worker thread error: {}", panic_message(panic.as_ref()))))
    }
}

struct Reporter {
    tx: Sender<WorkerEvent>,
}

impl Reporter {
    fn send(&self, event: WorkerEvent) {
        // Nobody listening is fine
        let _ = self.tx.send(event);
    }

    fn progress(&self, percent: u8) {
        self.send(WorkerEvent::Progress(percent));
    }

    fn status(&self, message: &str) {
        self.send(WorkerEvent::Status(message.to_string()));
    }

    fn log(&self, message: &str) {
        self.send(WorkerEvent::Log(message.to_string()));
    }
}

fn failure(message: String) -> ConversionOutcome {
    ConversionOutcome {
        error_message: Some(message),
        ..ConversionOutcome::default()
    }
}

fn run(service: &ConversionService, job: &ConversionJob, reporter: &Reporter) -> ConversionOutcome {
    reporter.status("Initializing conversion...");
    reporter.log(&format!("Starting conversion: {}", job.display_name()));
    reporter.progress(10);

    if !service.is_pandoc_available() {
        return failure("Pandoc is not available on this system".to_string());
    }
    let info = service.get_pandoc_info();
    reporter.log(&format!("Pandoc detected: {} (v{})", info.path.display(), info.version));
    reporter.progress(25);

    reporter.status("Validating input file...");
    if !service.validate_input_file(&job.input_path) {
        return failure(format!("Invalid input file: {}", job.input_path.display()));
    }
    reporter.log(&format!("Input file validated: {}", job.input_path.display()));
    reporter.progress(40);

    reporter.status(&format!("Converting to {}...", job.output_format.as_str().to_uppercase()));
    reporter.progress(50);

    let outcome = service.convert(job);
    if outcome.success {
        reporter.progress(90);
        reporter.log(&format!("Conversion completed in {:.2}s", outcome.duration_seconds));
        match outcome.output_path.as_deref().map(std::fs::metadata) {
            Some(Ok(meta)) => {
                reporter.log(&format!("Output file size: {} bytes", meta.len()));
                reporter.status("Conversion completed successfully!");
            }
            Some(Err(_)) => {
                reporter.log("Output file not found after conversion");
                reporter.status("Conversion completed with warnings");
            }
            None => reporter.status("Conversion completed successfully!"),
        }
        reporter.progress(100);
    } else {
        reporter.log(&format!("Conversion failed: {}", outcome.error_text()));
        reporter.status("Conversion failed");
        if let Some(command) = &outcome.command {
            reporter.log(&format!("Command: {command}"));
        }
    }
    outcome
}
