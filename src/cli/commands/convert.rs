use crate::cli::Output;
use crate::cli::args::JobArgs;
use crate::config::AppConfig;
use crate::job::ConversionOutcome;
use crate::parallel::{SingleConversion, WorkerEvent};
use crate::utils::{file_size_label, format_seconds};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

#[derive(Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

pub async fn execute(args: ConvertArgs, config: &AppConfig, output: &Output) -> Result<()> {
    let job = args.job.to_job(config.batch.default_output_format)?;
    let service = Arc::new(config.conversion_service());
    let name = job.display_name();

    output.step(&format!("Converting {} to {}", name, job.output_format));
    let bar = output.percent_bar(&name);
    let conversion = SingleConversion::spawn(service, job).context("Failed to start the conversion thread")?;

    let reporter = *output;
    let outcome = tokio::task::spawn_blocking(move || {
        for event in conversion.events().iter() {
            match event {
                WorkerEvent::Progress(percent) => bar.set_position(u64::from(percent)),
                WorkerEvent::Status(status) => bar.set_message(status),
                WorkerEvent::Log(line) => bar.suspend(|| reporter.verbose(&line)),
                WorkerEvent::Finished(_) => break,
            }
        }
        bar.finish_and_clear();
        conversion.wait()
    })
    .await
    .context("Conversion thread was interrupted")?;

    report(&outcome, output)
}

fn report(outcome: &ConversionOutcome, output: &Output) -> Result<()> {
    if !outcome.success {
        output.error(outcome.error_text());
        if let Some(command) = &outcome.command {
            output.verbose(&format!("Command: {command}"));
        }
        anyhow::bail!("Conversion failed");
    }

    let target = outcome
        .output_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "standard output".to_string());
    output.success(&format!("Converted to {} in {}", target, format_seconds(outcome.duration_seconds)));
    if let Some(size) = outcome.output_path.as_ref().and_then(file_size_label) {
        output.key_value("Size:", &size, false);
    }
    Ok(())
}
