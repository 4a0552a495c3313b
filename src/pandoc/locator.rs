//! Pandoc executable discovery
//!
//! Detection walks an ordered list of places and keeps the first candidate that
//! exists on disk and answers `--version`:
//!
//! 1. an explicitly configured path
//! 2. the process `PATH` (via `which`)
//! 3. platform install locations (package-manager bin dirs, vendor roots)
//! 4. on Windows, a manual `PATH` scan over `.exe`/`.cmd`/`.bat` variants
//!
//! The result is memoized per locator instance until [`PandocLocator::clear_cache`].

use super::process::{ProcessResult, run_with_timeout};
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sentinel version reported when nothing usable was found
pub const UNKNOWN_VERSION: &str = "unknown";

const DEFAULT_PROGRAM: &str = "pandoc";
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static DOTTED_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("version pattern is valid"));

/// What detection found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PandocInfo {
    pub path: PathBuf,
    pub version: String,
    pub available: bool,
}

impl PandocInfo {
    fn found(path: PathBuf, version: String) -> Self {
        Self { path, version, available: true }
    }

    fn missing(program: &str) -> Self {
        Self {
            path: PathBuf::from(program),
            version: UNKNOWN_VERSION.to_string(),
            available: false,
        }
    }
}

/// Where and how to look for the executable
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Checked before anything else
    pub explicit_path: Option<PathBuf>,
    /// Executable base name
    pub program: String,
    /// Search the platform's well-known install locations
    pub search_well_known: bool,
    /// Additional directories checked after the well-known ones
    pub extra_dirs: Vec<PathBuf>,
    pub probe_timeout: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            explicit_path: None,
            program: DEFAULT_PROGRAM.to_string(),
            search_well_known: true,
            extra_dirs: Vec::new(),
            probe_timeout: VERSION_PROBE_TIMEOUT,
        }
    }
}

impl LocatorConfig {
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }
}

/// Finds pandoc and remembers the answer
#[derive(Debug, Default)]
pub struct PandocLocator {
    config: LocatorConfig,
    cached: RwLock<Option<PandocInfo>>,
}

impl PandocLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            config,
            cached: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Detect pandoc, using the memoized result when present. Never fails.
    pub fn detect(&self) -> PandocInfo {
        if let Some(info) = self.cached.read().as_ref() {
            return info.clone();
        }

        let mut cached = self.cached.write();
        // Another thread may have finished detection while we waited for the lock
        if let Some(info) = cached.as_ref() {
            return info.clone();
        }

        let info = self.search();
        if info.available {
            info!("Found pandoc {} at {}", info.version, info.path.display());
        } else {
            warn!("Pandoc executable not found");
        }
        *cached = Some(info.clone());
        info
    }

    pub fn is_available(&self) -> bool {
        self.detect().available
    }

    /// Forget the memoized result; the next call re-detects
    pub fn clear_cache(&self) {
        *self.cached.write() = None;
    }

    fn search(&self) -> PandocInfo {
        if let Some(explicit) = &self.config.explicit_path {
            if let Some(info) = self.try_candidate(explicit) {
                return info;
            }
            warn!("Configured pandoc path {} is not usable, searching instead", explicit.display());
        }

        if let Ok(on_path) = which::which(&self.config.program) {
            if let Some(info) = self.try_candidate(&on_path) {
                return info;
            }
        }

        let mut candidates = Vec::new();
        if self.config.search_well_known {
            candidates.extend(well_known_locations(&self.config.program));
        }
        candidates.extend(
            self.config
                .extra_dirs
                .iter()
                .map(|dir| dir.join(executable_name(&self.config.program))),
        );
        for candidate in &candidates {
            if let Some(info) = self.try_candidate(candidate) {
                return info;
            }
        }

        if cfg!(windows) {
            for candidate in manual_path_scan(&self.config.program) {
                if let Some(info) = self.try_candidate(&candidate) {
                    return info;
                }
            }
        }

        PandocInfo::missing(&self.config.program)
    }

    fn try_candidate(&self, path: &Path) -> Option<PandocInfo> {
        if !path.is_file() {
            return None;
        }
        debug!("Probing pandoc candidate {}", path.display());
        probe_version(path, self.config.probe_timeout).map(|version| PandocInfo::found(path.to_path_buf(), version))
    }
}

/// Run `<path> --version` and parse the version out of its output
pub fn probe_version(path: &Path, timeout: Duration) -> Option<String> {
    match run_with_timeout(path, &["--version"], timeout) {
        Ok(ProcessResult::Exited(output)) if output.success() => parse_version(&output.stdout),
        Ok(ProcessResult::Exited(output)) => {
            debug!("{} --version exited with {}", path.display(), output.status);
            None
        }
        Ok(ProcessResult::TimedOut { .. }) => {
            debug!("{} --version timed out", path.display());
            None
        }
        Err(e) => {
            debug!("Could not run {}: {}", path.display(), e);
            None
        }
    }
}

/// `"pandoc 3.1.9\nFeatures: …"` → `"3.1.9"`
///
/// Falls back to the first dotted number anywhere in the output so renamed
/// executables (`pandoc.exe`, wrappers) still report a version.
pub fn parse_version(output: &str) -> Option<String> {
    let first_line = output.trim().lines().next()?;
    let mut tokens = first_line.split_whitespace();
    if let (Some(name), Some(version)) = (tokens.next(), tokens.next()) {
        if name.to_ascii_lowercase().starts_with(DEFAULT_PROGRAM) && version.starts_with(|c: char| c.is_ascii_digit()) {
            return Some(version.to_string());
        }
    }
    DOTTED_VERSION.find(output).map(|m| m.as_str().to_string())
}

fn executable_name(program: &str) -> String {
    if cfg!(windows) && Path::new(program).extension().is_none() {
        format!("{program}.exe")
    } else {
        program.to_string()
    }
}

/// Ordered install locations for the current platform
pub fn well_known_locations(program: &str) -> Vec<PathBuf> {
    let exe = executable_name(program);
    let mut paths = Vec::new();

    if cfg!(windows) {
        let program_files = [
            std::env::var_os("PROGRAMFILES").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(r"C:\Program Files")),
            std::env::var_os("PROGRAMFILES(X86)")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)")),
        ];
        for root in &program_files {
            paths.push(root.join("Pandoc").join(&exe));
            paths.push(root.join("pandoc").join(&exe));
        }
        paths.push(PathBuf::from(r"C:\ProgramData\chocolatey\bin").join(&exe));
        if let Some(profile) = std::env::var_os("USERPROFILE") {
            paths.push(PathBuf::from(profile).join(r"scoop\apps\pandoc\current").join(&exe));
        }
    } else if cfg!(target_os = "macos") {
        for dir in ["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin", "/opt/local/bin"] {
            paths.push(Path::new(dir).join(&exe));
        }
    } else {
        for dir in ["/usr/bin", "/usr/local/bin", "/opt/pandoc/bin", "/snap/bin"] {
            paths.push(Path::new(dir).join(&exe));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".local/share/flatpak/exports/bin").join(&exe));
        }
    }

    paths
}

/// Directory-by-directory `PATH` walk; `which` misses some shell shims on Windows
fn manual_path_scan(program: &str) -> Vec<PathBuf> {
    let Some(path_var) = std::env::var_os("PATH") else {
        return Vec::new();
    };
    let variants = ["exe", "cmd", "bat"].map(|ext| format!("{program}.{ext}"));
    std::env::split_paths(&path_var)
        .flat_map(|dir| variants.iter().map(move |name| dir.join(name)).collect::<Vec<_>>())
        .collect()
}
