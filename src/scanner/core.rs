use crate::formats::OutputFormat;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Directory and file names never descended into or returned
pub const DEFAULT_IGNORE_NAMES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    "env",
    ".DS_Store",
    "Thumbs.db",
];

/// Input extensions pandoc reads, grouped by dialect
pub const EXTENSION_CATEGORIES: &[(&str, &[&str])] = &[
    ("markdown", &[".md", ".markdown", ".mdown", ".mkd", ".mkdn"]),
    ("restructuredtext", &[".rst", ".rest"]),
    ("asciidoc", &[".adoc", ".asciidoc"]),
    ("textile", &[".textile"]),
    ("html", &[".html", ".htm"]),
    ("latex", &[".tex", ".latex"]),
    ("docx", &[".docx"]),
    ("odt", &[".odt"]),
    ("epub", &[".epub"]),
    ("org", &[".org"]),
    ("mediawiki", &[".wiki"]),
    ("twiki", &[".twiki"]),
    ("opml", &[".opml"]),
    ("json", &[".json"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Recursive,
    SingleLevel,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extensions to keep; empty means every known input extension
    pub extensions: BTreeSet<String>,
    pub mode: ScanMode,
    pub max_files: usize,
    pub ignore_names: BTreeSet<String>,
    pub respect_gitignore: bool,
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: BTreeSet::new(),
            mode: ScanMode::Recursive,
            max_files: 10_000,
            ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: false,
            follow_symlinks: false,
        }
    }
}

impl ScanOptions {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        self
    }

    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FolderScanResult {
    /// Matching files, sorted
    pub files: Vec<PathBuf>,
    /// Files visited before filtering
    pub total_count: usize,
    pub filtered_count: usize,
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl FolderScanResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for FolderScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} files, {} matching filters, {} errors",
            self.total_count,
            self.filtered_count,
            self.errors.len()
        )
    }
}

/// Enumerates candidate input documents under a folder
#[derive(Debug, Clone, Default)]
pub struct FolderScanner;

impl FolderScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, root: &Path, options: &ScanOptions) -> FolderScanResult {
        let started = Instant::now();
        let mut result = FolderScanResult::default();

        if !root.exists() {
            result.errors.push(format!("Folder does not exist: {}", root.display()));
            result.duration = started.elapsed();
            return result;
        }
        if !root.is_dir() {
            result.errors.push(format!("Path is not a directory: {}", root.display()));
            result.duration = started.elapsed();
            return result;
        }

        let extensions = if options.extensions.is_empty() {
            supported_extensions(None)
        } else {
            options.extensions.iter().map(|e| normalize_extension(e)).collect()
        };
        info!("Scanning folder: {} ({:?})", root.display(), options.mode);
        debug!("Extensions: {:?}", extensions);

        let ignore_names = options.ignore_names.clone();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .follow_links(options.follow_symlinks)
            .git_ignore(options.respect_gitignore)
            .git_global(options.respect_gitignore)
            .git_exclude(options.respect_gitignore)
            .ignore(options.respect_gitignore)
            .parents(options.respect_gitignore)
            .require_git(false)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                !ignore_names.contains(name.as_ref())
            });
        if options.mode == ScanMode::SingleLevel {
            builder.max_depth(Some(1));
        }

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    result.errors.push(format!("Walk error: {e}"));
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            result.total_count += 1;
            if !has_extension(entry.path(), &extensions) {
                continue;
            }
            if result.files.len() >= options.max_files {
                warn!("Reached max_files limit ({}), stopping scan", options.max_files);
                break;
            }
            result.files.push(entry.into_path());
        }

        result.files.sort();
        result.filtered_count = result.files.len();
        result.duration = started.elapsed();
        info!(
            "Scan completed: {} total, {} filtered, {:.2}s",
            result.total_count,
            result.filtered_count,
            result.duration.as_secs_f64()
        );
        result
    }
}

/// Every known input extension, or the subset that converts well to `output`
pub fn supported_extensions(output: Option<OutputFormat>) -> BTreeSet<String> {
    let categories: Vec<&str> = match output {
        None => EXTENSION_CATEGORIES.iter().map(|(name, _)| *name).collect(),
        Some(OutputFormat::Pdf) => vec!["markdown", "latex", "restructuredtext"],
        Some(OutputFormat::Html) => vec!["markdown", "restructuredtext", "asciidoc", "textile"],
        Some(OutputFormat::Docx) => vec!["markdown", "restructuredtext", "html"],
        Some(_) => vec!["markdown", "restructuredtext"],
    };
    EXTENSION_CATEGORIES
        .iter()
        .filter(|(name, _)| categories.contains(name))
        .flat_map(|(_, exts)| exts.iter().map(|e| e.to_string()))
        .collect()
}

/// `"MD"` → `".md"`
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_ascii_lowercase();
    if lower.starts_with('.') { lower } else { format!(".{lower}") }
}

fn has_extension(path: &Path, extensions: &BTreeSet<String>) -> bool {
    path.extension()
        .map(|ext| extensions.contains(&format!(".{}", ext.to_string_lossy().to_ascii_lowercase())))
        .unwrap_or(false)
}
