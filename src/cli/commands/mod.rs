use crate::cli::Output;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

pub mod batch;
pub mod check;
pub mod config;
pub mod convert;
pub mod formats;
pub mod preview;
pub mod profile;
pub mod version;

#[derive(Parser)]
#[command(
    name = "pandoc-batch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Convert documents with pandoc, one at a time or whole folders in parallel",
    long_about = "pandoc-batch locates the pandoc executable, builds its command lines from \
                  formats and options, and runs folder-sized batches on a bounded worker pool."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single document
    Convert(convert::ConvertArgs),
    /// Convert every matching document in a folder
    ///
    /// Ctrl-C cancels conversions that have not started and waits for the running
    /// ones; a second Ctrl-C quits without waiting.
    Batch(batch::BatchArgs),
    /// Report whether pandoc was found and which version
    Check(check::CheckArgs),
    /// List the supported input and output formats
    Formats(formats::FormatsArgs),
    /// Print the pandoc command a conversion would run
    Preview(preview::PreviewArgs),
    /// Manage saved conversion profiles
    Profile(profile::ProfileArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show version information
    Version(version::VersionArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let loaded = AppConfig::load(self.config.as_deref());
        let configured_level = loaded
            .as_ref()
            .map(|config| config.logging.filter_level().to_string())
            .unwrap_or_else(|_| "warn".to_string());

        setup_logging(self.verbose, self.quiet, &configured_level);
        let output = Output::new(self.verbose > 0, self.quiet);

        let Some(command) = self.command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        // `config` has to be able to show and validate a broken file
        let loaded = match command {
            Commands::Config(_) => loaded,
            _ => loaded.and_then(|config| {
                config.validate().context("Invalid configuration")?;
                Ok(config)
            }),
        };

        match command {
            Commands::Convert(args) => convert::execute(args, &loaded?, &output).await,
            Commands::Batch(args) => batch::execute(args, &loaded?, &output).await,
            Commands::Check(args) => check::execute(args, &loaded?, &output).await,
            Commands::Formats(args) => formats::execute(args, &output).await,
            Commands::Preview(args) => preview::execute(args, &loaded?, &output).await,
            Commands::Profile(args) => profile::execute(args, &loaded?, &output).await,
            Commands::Config(args) => config::execute(args, loaded, self.config.as_deref(), &output).await,
            Commands::Version(args) => version::execute(args).await,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool, configured_level: &str) {
    if quiet {
        return;
    }

    // The directory walker is chatty below warn
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new(format!("{configured_level},ignore=warn")),
        1 => tracing_subscriber::EnvFilter::new("info,ignore=warn"),
        2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
