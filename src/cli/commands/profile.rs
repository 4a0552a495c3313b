use crate::cli::Output;
use crate::cli::args::OptionArgs;
use crate::config::AppConfig;
use crate::formats::{InputFormat, OutputFormat};
use crate::profiles::ProfileRepository;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// List saved profiles, newest first
    List,
    /// Print a profile as JSON
    Show { name: String },
    /// Delete a profile
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create or update a profile
    Save(SaveArgs),
}

#[derive(Args)]
pub struct SaveArgs {
    pub name: String,

    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    pub to: Option<OutputFormat>,

    #[arg(short = 'f', long = "from", value_name = "FORMAT")]
    pub from: Option<InputFormat>,

    /// Directory converted files are written to
    #[arg(short = 'd', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extensions to pick up, e.g. `.md,.rst`
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Only look at the folder itself, not its subfolders
    #[arg(long)]
    pub single_level: bool,

    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    #[arg(long, value_name = "ENGINE")]
    pub pdf_engine: Option<String>,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub async fn execute(args: ProfileArgs, config: &AppConfig, output: &Output) -> Result<()> {
    let repository = ProfileRepository::new(config.profiles_dir());

    match args.command {
        ProfileCommand::List => {
            let profiles = repository.list();
            if profiles.is_empty() {
                output.info(&format!("No profiles in {}", repository.dir().display()));
                return Ok(());
            }
            output.category(&format!("Profiles ({})", profiles.len()));
            for profile in profiles {
                output.list_item(&format!(
                    "{} → {} (modified {})",
                    profile.name,
                    profile.output_format,
                    profile.modified_at.format("%Y-%m-%d %H:%M")
                ));
            }
        }
        ProfileCommand::Show { name } => match repository.load(&name)? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => anyhow::bail!("Profile '{}' not found", name),
        },
        ProfileCommand::Delete { name, yes } => {
            if !repository.exists(&name) {
                anyhow::bail!("Profile '{}' not found", name);
            }
            if !yes && !output.confirm(&format!("Delete profile '{name}'?")) {
                output.info("Nothing deleted");
                return Ok(());
            }
            repository.delete(&name)?;
            output.success(&format!("Deleted profile '{name}'"));
        }
        ProfileCommand::Save(save) => {
            let mut profile = match repository.load(&save.name)? {
                Some(existing) => existing,
                None => repository.default_profile(&save.name, &config.batch),
            };

            if let Some(to) = save.to {
                profile.output_format = to;
            }
            if save.from.is_some() {
                profile.input_format = save.from;
            }
            if save.output_dir.is_some() {
                profile.output_dir = save.output_dir;
            }
            if !save.extensions.is_empty() {
                profile.extensions = save.extensions;
            }
            if save.single_level {
                profile.recursive = false;
            }
            if let Some(max_files) = save.max_files {
                profile.max_files = max_files;
            }
            if let Some(jobs) = save.jobs {
                profile.max_concurrent_jobs = crate::parallel::queue::clamp_concurrency(jobs);
            }
            if save.pdf_engine.is_some() {
                profile.pdf_engine = save.pdf_engine;
            }
            profile.options.extend(save.options.parse()?);

            let path = repository.save(&mut profile)?;
            output.success(&format!("Saved profile '{}' to {}", profile.name, path.display()));
        }
    }
    Ok(())
}
