use crate::cli::Output;
use crate::formats::{InputFormat, OutputFormat};
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct FormatsArgs {
    /// List input formats instead of output formats
    #[arg(long)]
    pub input: bool,
}

pub async fn execute(args: FormatsArgs, output: &Output) -> Result<()> {
    if args.input {
        output.category(&format!("Input formats ({})", InputFormat::ALL.len()));
        for format in InputFormat::ALL {
            println!("  {:<20} .{}", format.as_str(), format.extension());
        }
    } else {
        output.category(&format!("Output formats ({})", OutputFormat::ALL.len()));
        for format in OutputFormat::ALL {
            println!("  {:<20} .{}", format.as_str(), format.extension());
        }
    }
    Ok(())
}
