//! Named conversion profiles stored as JSON snapshots

use crate::config::PandocConfig;
use crate::formats::{InputFormat, OutputFormat};
use crate::job::{ConversionJob, ConversionOptions};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAX_FILE_STEM: usize = 100;
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', ' '];

/// Saved settings for repeated conversions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub input_format: Option<InputFormat>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default)]
    pub pdf_engine: Option<String>,
    #[serde(default)]
    pub html_standalone: Option<bool>,
    #[serde(default)]
    pub options: ConversionOptions,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,
}

fn default_extensions() -> Vec<String> {
    vec![".md".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_max_files() -> usize {
    1000
}

fn default_max_concurrent() -> usize {
    crate::parallel::queue::DEFAULT_CONCURRENT
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            modified_at: now,
            output_format: OutputFormat::default(),
            input_format: None,
            output_dir: None,
            extensions: default_extensions(),
            recursive: true,
            max_files: default_max_files(),
            pdf_engine: None,
            html_standalone: None,
            options: ConversionOptions::new(),
            max_concurrent_jobs: default_max_concurrent(),
        }
    }

    /// Job for `input` carrying this profile's formats and options.
    /// `output_dir` overrides the profile's own output directory.
    pub fn job_for(&self, input: &Path, output_dir: Option<&Path>) -> ConversionJob {
        let mut job = ConversionJob::new(input, self.output_format).with_options(self.options.clone());
        if let Some(input_format) = self.input_format {
            job = job.with_input_format(input_format);
        }
        if let Some(dir) = output_dir.or(self.output_dir.as_deref()) {
            if let Some(file_name) = job.output_path.as_deref().and_then(Path::file_name) {
                let target = dir.join(file_name);
                job = job.with_output(target);
            }
        }
        job
    }

    /// Overlay the profile's engine settings onto `pandoc`
    pub fn apply_to(&self, pandoc: &mut PandocConfig) {
        if let Some(engine) = &self.pdf_engine {
            pandoc.pdf_engine = engine.clone();
        }
        if let Some(standalone) = self.html_standalone {
            pandoc.html_standalone = standalone;
        }
    }
}

/// Directory of `<name>.json` profile files
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    dir: PathBuf,
}

impl ProfileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the profile, stamping `modified_at`; returns the file written
    pub fn save(&self, profile: &mut Profile) -> Result<PathBuf> {
        profile.modified_at = Utc::now();
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create profiles directory: {}", self.dir.display()))?;

        let path = self.path_for(&profile.name);
        let content = serde_json::to_string_pretty(profile).context("Failed to serialize profile")?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write profile: {}", path.display()))?;

        info!("Profile '{}' saved to {}", profile.name, path.display());
        Ok(path)
    }

    /// `Ok(None)` when no such profile exists
    pub fn load(&self, name: &str) -> Result<Option<Profile>> {
        let path = self.path_for(name);
        if !path.exists() {
            warn!("Profile '{}' not found at {}", name, path.display());
            return Ok(None);
        }
        read_profile(&path).map(Some)
    }

    /// Every readable profile, newest first
    pub fn list(&self) -> Vec<Profile> {
        let mut profiles: Vec<Profile> = self
            .profile_files()
            .into_iter()
            .filter_map(|path| match read_profile(&path) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!("Failed to load profile from {}: {:#}", path.display(), e);
                    None
                }
            })
            .collect();
        profiles.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        profiles
    }

    /// `Ok(false)` when there was nothing to delete
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if !path.exists() {
            warn!("Profile '{}' not found for deletion", name);
            return Ok(false);
        }
        std::fs::remove_file(&path).with_context(|| format!("Failed to delete profile: {}", path.display()))?;
        info!("Profile '{}' deleted", name);
        Ok(true)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn count(&self) -> usize {
        self.profile_files().len()
    }

    /// Fresh profile seeded from the application defaults
    pub fn default_profile(&self, name: &str, batch: &crate::config::BatchConfig) -> Profile {
        Profile {
            output_format: batch.default_output_format,
            extensions: batch.default_extensions.clone(),
            recursive: batch.recursive,
            max_files: batch.max_batch_files,
            max_concurrent_jobs: batch.effective_max_concurrent(),
            ..Profile::new(name)
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_file_stem(name)))
    }

    fn profile_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

fn read_profile(path: &Path) -> Result<Profile> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read profile: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse profile: {}", path.display()))
}

/// `"My PDF: draft"` → `"My_PDF__draft"`
pub fn sanitize_file_stem(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_FILE_STEM)
        .collect();
    if replaced.is_empty() {
        "unnamed_profile".to_string()
    } else {
        replaced
    }
}
