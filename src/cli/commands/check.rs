use crate::cli::Output;
use crate::config::AppConfig;
use anyhow::Result;
use clap::Args;

#[derive(Args, Default)]
pub struct CheckArgs {
    /// Print the detection result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: CheckArgs, config: &AppConfig, output: &Output) -> Result<()> {
    let service = config.conversion_service();
    let info = service.get_pandoc_info();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else if info.available {
        output.success("Pandoc is available");
        output.key_value("Path:", &info.path.display().to_string(), true);
        output.key_value("Version:", &info.version, false);
        let options = service.runner_options();
        output.key_value("PDF engine:", &options.pdf_engine, false);
        output.key_value("Timeout:", &format!("{}s", options.timeout.as_secs()), false);
    } else {
        output.error("Pandoc is not available on this system");
        output.indent("Install it from https://pandoc.org/installing.html or set pandoc.path in the config");
    }

    if !info.available {
        anyhow::bail!("Pandoc not found");
    }
    Ok(())
}
