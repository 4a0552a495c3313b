//! Arguments shared by the commands that describe a single conversion

use crate::formats::{InputFormat, OutputFormat};
use crate::job::{ConversionJob, ConversionOptions, OptionValue};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Document to convert
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output format (defaults to batch.default_output_format)
    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    pub to: Option<OutputFormat>,

    /// Input format; pandoc guesses from the extension when omitted
    #[arg(short = 'f', long = "from", value_name = "FORMAT")]
    pub from: Option<InputFormat>,

    /// Output file (defaults to the input path with the format's extension)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: OptionArgs,
}

impl JobArgs {
    pub fn to_job(&self, default_format: OutputFormat) -> Result<ConversionJob> {
        let mut job = ConversionJob::new(&self.input, self.to.unwrap_or(default_format))
            .with_options(self.options.parse()?);
        if let Some(from) = self.from {
            job = job.with_input_format(from);
        }
        if let Some(output) = &self.output {
            job = job.with_output(output);
        }
        Ok(job)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Extra pandoc flag, `toc` or `css=style.css` (repeatable)
    #[arg(long = "opt", value_name = "KEY[=VALUE]")]
    pub opts: Vec<String>,
}

impl OptionArgs {
    pub fn parse(&self) -> Result<ConversionOptions> {
        self.opts.iter().map(|raw| parse_option(raw)).collect()
    }
}

/// `toc` → `("toc", true)`, `--css=a.css` → `("css", "a.css")`
pub fn parse_option(raw: &str) -> Result<(String, OptionValue)> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key, OptionValue::parse_cli(value)),
        None => (raw, OptionValue::Bool(true)),
    };
    let key = key.trim().trim_start_matches("--");
    if key.is_empty() {
        anyhow::bail!("Invalid option '{}': the flag name is empty", raw);
    }
    Ok((key.to_string(), value))
}
