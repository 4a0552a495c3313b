//! Configuration management for pandoc-batch
//!
//! Settings are layered with figment, later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`AppConfig::default`])
//! 2. the global file `<config_dir>/pandoc-batch/config.toml`
//! 3. a project file `pandoc-batch.{toml,json,yaml,yml}` found by walking up
//!    from the working directory, or the file passed with `--config`
//! 4. `PANDOC_BATCH_*` environment variables, nested with `__`
//!    (`PANDOC_BATCH_BATCH__MAX_CONCURRENT_JOBS=8`)

pub mod smart_load;

use crate::formats::OutputFormat;
use crate::pandoc::{ConversionService, LocatorConfig, RunnerOptions};
use crate::parallel::queue::{MAX_CONCURRENT, MIN_CONCURRENT, clamp_concurrency};
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
pub use smart_load::ConfigFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR: &str = "pandoc-batch";
pub const ENV_PREFIX: &str = "PANDOC_BATCH_";
pub const PROJECT_CONFIG_NAMES: &[&str] = &[
    "pandoc-batch.toml",
    "pandoc-batch.json",
    "pandoc-batch.yaml",
    "pandoc-batch.yml",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub pandoc: PandocConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
    pub profiles: ProfilesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PandocConfig {
    /// Executable to use instead of searching for one
    pub path: Option<PathBuf>,
    pub timeout_seconds: u64,
    pub pdf_engine: String,
    /// Pass `--standalone` for HTML output
    pub html_standalone: bool,
    /// Also look in the usual install directories when PATH has no pandoc
    pub search_well_known: bool,
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            path: None,
            timeout_seconds: 300,
            pdf_engine: "pdflatex".to_string(),
            html_standalone: true,
            search_well_known: true,
        }
    }
}

impl PandocConfig {
    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            explicit_path: self.path.clone(),
            search_well_known: self.search_well_known,
            ..LocatorConfig::default()
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            timeout: Duration::from_secs(self.timeout_seconds),
            pdf_engine: self.pdf_engine.clone(),
            html_standalone: self.html_standalone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker cap; 0 picks one from the CPU count
    pub max_concurrent_jobs: usize,
    pub default_output_format: OutputFormat,
    pub default_extensions: Vec<String>,
    pub recursive: bool,
    pub max_batch_files: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            default_output_format: OutputFormat::Html,
            default_extensions: vec![".md".to_string(), ".markdown".to_string(), ".txt".to_string()],
            recursive: true,
            max_batch_files: 1000,
        }
    }
}

impl BatchConfig {
    /// Configured cap, or three quarters of the cores when set to 0
    pub fn effective_max_concurrent(&self) -> usize {
        if self.max_concurrent_jobs == 0 {
            clamp_concurrency(crate::parallel::pool::calculate_optimal_workers(MAX_CONCURRENT, 75))
        } else {
            clamp_concurrency(self.max_concurrent_jobs)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Level usable as a tracing filter; unknown values become `info`
    pub fn filter_level(&self) -> &str {
        let level = self.level.trim();
        LOG_LEVELS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(level))
            .copied()
            .unwrap_or("info")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfilesConfig {
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load with the standard layers; `custom` replaces the project file search
    pub fn load(custom: Option<&Path>) -> Result<Self> {
        let project = match custom {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::find_project_config(),
        };
        Self::from_figment(Self::layered(Self::global_config_path(), project, ENV_PREFIX))
    }

    /// Defaults, then the given files, then environment variables under `env_prefix`
    pub fn layered(global: Option<PathBuf>, project: Option<PathBuf>, env_prefix: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                figment = figment.merge(smart_load::auto(&path));
            }
        }
        figment.merge(Env::prefixed(env_prefix).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract().context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Read a single file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(smart_load::auto(path));
        figment
            .extract()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        let content = match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).context("Failed to serialize configuration as TOML")?,
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize configuration as JSON")?
            }
            ConfigFormat::Yaml => serde_yml::to_string(self).context("Failed to serialize configuration as YAML")?,
        };
        Ok(content)
    }

    /// Write as TOML, JSON or YAML depending on the extension (TOML otherwise)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = self.render(ConfigFormat::from_extension(path).unwrap_or(ConfigFormat::Toml))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(10..=3600).contains(&self.pandoc.timeout_seconds) {
            anyhow::bail!(
                "pandoc.timeout_seconds must be between 10 and 3600, got {}",
                self.pandoc.timeout_seconds
            );
        }
        if self.pandoc.pdf_engine.trim().is_empty() {
            anyhow::bail!("pandoc.pdf_engine cannot be empty");
        }
        if let Some(path) = &self.pandoc.path {
            if !path.is_file() {
                anyhow::bail!("pandoc.path does not point to a file: {}", path.display());
            }
        }

        let jobs = self.batch.max_concurrent_jobs;
        if jobs != 0 && !(MIN_CONCURRENT..=MAX_CONCURRENT).contains(&jobs) {
            anyhow::bail!(
                "batch.max_concurrent_jobs must be between {} and {} (or 0 for auto), got {}",
                MIN_CONCURRENT,
                MAX_CONCURRENT,
                jobs
            );
        }
        if !(1..=10_000).contains(&self.batch.max_batch_files) {
            anyhow::bail!(
                "batch.max_batch_files must be between 1 and 10000, got {}",
                self.batch.max_batch_files
            );
        }
        if self.batch.default_extensions.iter().any(|e| e.trim().trim_start_matches('.').is_empty()) {
            anyhow::bail!("batch.default_extensions cannot contain empty entries");
        }

        Ok(())
    }

    /// Directory holding saved profiles
    pub fn profiles_dir(&self) -> PathBuf {
        self.profiles
            .dir
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("profiles")))
            .unwrap_or_else(|| PathBuf::from("profiles"))
    }

    pub fn conversion_service(&self) -> ConversionService {
        ConversionService::new(self.pandoc.locator_config(), self.pandoc.runner_options())
    }

    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Nearest project config walking up from the working directory
    pub fn find_project_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        find_config_from(&current)
    }
}

pub(crate) fn find_config_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests;
