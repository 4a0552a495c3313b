use crate::cli::Output;
use crate::cli::args::JobArgs;
use crate::config::AppConfig;
use crate::error::ConversionError;
use crate::pandoc::PandocRunner;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

pub async fn execute(args: PreviewArgs, config: &AppConfig, output: &Output) -> Result<()> {
    let job = args.job.to_job(config.batch.default_output_format)?;
    let service = config.conversion_service();

    let command = match service.preview(&job) {
        Ok(command) => command,
        Err(ConversionError::ToolUnavailable) => {
            output.warning("Pandoc was not found; showing the command with a bare `pandoc`");
            PandocRunner::with_options("pandoc", service.runner_options().clone()).render_command(&job)
        }
        Err(e) => return Err(e.into()),
    };

    println!("{command}");
    Ok(())
}
