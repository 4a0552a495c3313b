//! Utility functions for pandoc-batch
//!
//! Small formatting and filesystem helpers shared by the CLI commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Ensure a directory exists
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {}", path.display()))?;
    Ok(())
}

/// Get the current working directory
pub fn get_current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to read the current directory")
}

/// Format file size in human-readable format
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Size of the file at `path`, if it can be read
pub fn file_size_label<P: AsRef<Path>>(path: P) -> Option<String> {
    std::fs::metadata(path).ok().map(|meta| format_file_size(meta.len()))
}

/// `0.42` → `"0.42s"`, `75.0` → `"1m 15s"`
pub fn format_seconds(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.2}s")
    } else {
        let whole = seconds.round() as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

/// Truncate string to specified length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// `path` relative to `base` when it lives under it, otherwise unchanged
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.4213), "0.42s");
        assert_eq!(format_seconds(75.0), "1m 15s");
    }

    #[test]
    fn test_truncate_string_is_char_safe() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("déjà vu encore", 8), "déjà ...");
        assert_eq!(truncate_string("abcdef", 2), "...");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to(Path::new("/docs/a/b.md"), Path::new("/docs")), PathBuf::from("a/b.md"));
        assert_eq!(relative_to(Path::new("/other/b.md"), Path::new("/docs")), PathBuf::from("/other/b.md"));
    }
}
