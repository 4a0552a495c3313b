use super::*;
use crate::formats::OutputFormat;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "content").unwrap();
}

fn names(result: &FolderScanResult, root: &Path) -> Vec<String> {
    result
        .files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "b.md");
    touch(root, "a.MD");
    touch(root, "notes.rst");
    touch(root, "image.png");
    touch(root, "docs/guide.md");
    touch(root, "docs/deep/more.markdown");
    touch(root, "node_modules/pkg/readme.md");
    touch(root, ".hidden/secret.md");
    touch(root, ".draft.md");
    dir
}

#[test]
fn test_recursive_scan_filters_and_sorts() {
    let dir = sample_tree();
    let options = ScanOptions::default().with_extensions(["md", ".markdown"]);
    let result = FolderScanner::new().scan(dir.path(), &options);

    assert!(result.success());
    assert_eq!(names(&result, dir.path()), vec!["a.MD", "b.md", "docs/deep/more.markdown", "docs/guide.md"]);
    assert_eq!(result.filtered_count, 4);
    assert_eq!(result.total_count, 6);
}

#[test]
fn test_single_level_scan_skips_subfolders() {
    let dir = sample_tree();
    let options = ScanOptions::default()
        .with_extensions([".md"])
        .with_mode(ScanMode::SingleLevel);
    let result = FolderScanner::new().scan(dir.path(), &options);

    assert_eq!(names(&result, dir.path()), vec!["a.MD", "b.md"]);
}

#[test]
fn test_default_extensions_cover_known_inputs() {
    let dir = sample_tree();
    let result = FolderScanner::new().scan(dir.path(), &ScanOptions::default());
    let found = names(&result, dir.path());

    assert!(found.contains(&"notes.rst".to_string()));
    assert!(!found.contains(&"image.png".to_string()));
}

#[test]
fn test_max_files_caps_matches() {
    let dir = sample_tree();
    let options = ScanOptions::default().with_extensions([".md"]).with_max_files(2);
    let result = FolderScanner::new().scan(dir.path(), &options);
    assert_eq!(result.filtered_count, 2);
}

#[test]
fn test_missing_root_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = FolderScanner::new().scan(&dir.path().join("nope"), &ScanOptions::default());
    assert!(!result.success());
    assert!(result.errors[0].contains("does not exist"));
    assert!(result.files.is_empty());
}

#[test]
fn test_file_root_is_reported() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.md");
    let result = FolderScanner::new().scan(&dir.path().join("a.md"), &ScanOptions::default());
    assert!(result.errors[0].contains("not a directory"));
}

#[test]
fn test_supported_extensions_by_output() {
    let pdf = supported_extensions(Some(OutputFormat::Pdf));
    assert!(pdf.contains(".tex"));
    assert!(!pdf.contains(".html"));

    let all = supported_extensions(None);
    assert!(all.contains(".json"));
    assert!(all.len() > pdf.len());

    assert_eq!(normalize_extension(" MD "), ".md");
}

#[test]
fn test_summary_line() {
    let result = FolderScanResult {
        total_count: 5,
        filtered_count: 3,
        ..FolderScanResult::default()
    };
    assert_eq!(result.to_string(), "Found 5 files, 3 matching filters, 0 errors");
}
