use crate::cli::Output;
use crate::config::{AppConfig, ConfigFormat, PROJECT_CONFIG_NAMES};
use crate::utils::get_current_dir;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format: toml, json, yaml
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Check the merged configuration for errors
    Validate,
    /// Create a pandoc-batch.toml with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Where to write it (defaults to the current directory)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
    },
}

pub async fn execute(
    args: ConfigArgs,
    loaded: Result<AppConfig>,
    custom_config: Option<&Path>,
    output: &Output,
) -> Result<()> {
    match args.command {
        ConfigCommand::Show { format } => {
            let format = match format.to_lowercase().as_str() {
                "toml" => ConfigFormat::Toml,
                "json" => ConfigFormat::Json,
                "yaml" | "yml" => ConfigFormat::Yaml,
                _ => anyhow::bail!("Unsupported format: {}. Use json, toml, or yaml", format),
            };
            println!("{}", loaded?.render(format)?);
        }
        ConfigCommand::Validate => validate(loaded, custom_config, output)?,
        ConfigCommand::Init { force, path } => {
            let path = match path {
                Some(path) => path,
                None => get_current_dir()?.join(PROJECT_CONFIG_NAMES[0]),
            };
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save_to_file(&path)?;
            output.success(&format!("Created {}", path.display()));
        }
    }
    Ok(())
}

fn validate(loaded: Result<AppConfig>, custom_config: Option<&Path>, output: &Output) -> Result<()> {
    let config = match loaded.and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => config,
        Err(e) => {
            output.error("Configuration is invalid");
            output.indent(&format!("{e:#}"));
            return Err(e);
        }
    };

    output.success("Configuration is valid");
    output.category("Sources");
    let global = AppConfig::global_config_path().filter(|path| path.exists());
    let project = custom_config.map(Path::to_path_buf).or_else(AppConfig::find_project_config);
    output.key_value("Global file:", &describe(global.as_deref()), false);
    output.key_value("Project file:", &describe(project.as_deref()), false);

    output.category("Settings");
    output.key_value("Timeout:", &format!("{}s", config.pandoc.timeout_seconds), false);
    output.key_value("PDF engine:", &config.pandoc.pdf_engine, false);
    output.key_value("Output format:", config.batch.default_output_format.as_str(), false);
    output.key_value("Concurrent jobs:", &config.batch.effective_max_concurrent().to_string(), false);
    output.key_value("Profiles:", &config.profiles_dir().display().to_string(), false);
    Ok(())
}

fn describe(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "(none)".to_string())
}
