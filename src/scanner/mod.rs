//! Folder scanning for batch inputs

pub mod core;

pub use self::core::{
    DEFAULT_IGNORE_NAMES, EXTENSION_CATEGORIES, FolderScanResult, FolderScanner, ScanMode, ScanOptions,
    normalize_extension, supported_extensions,
};

#[cfg(test)]
mod tests;
