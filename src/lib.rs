//! # pandoc-batch
//!
//! Document conversion on top of the `pandoc` executable, one file at a time or
//! whole folders at once.
//!
//! ## Features
//!
//! - **Locator**: finds pandoc on PATH, in the usual install directories or at a
//!   configured path, and remembers its version
//! - **Invoker**: deterministic command lines with a per-run timeout
//! - **Batch queue**: a bounded worker pool with cancellation and progress events
//! - **Profiles**: named conversion settings saved as JSON
//!
//! ## Quick Start
//!
//! ```bash
//! pandoc-batch check
//! pandoc-batch convert notes.md -t pdf
//! pandoc-batch batch docs/ -t html -d site/ -j 8
//! ```
//!
//! Library users usually start from [`pandoc::ConversionService`] and
//! [`parallel::TaskQueue`].

pub mod cli;
pub mod config;
pub mod error;
pub mod formats;
pub mod job;
pub mod pandoc;
pub mod parallel;
pub mod profiles;
pub mod scanner;
pub mod utils;

pub use cli::{Cli, Output};
pub use config::AppConfig;
pub use error::ConversionError;
pub use job::{ConversionJob, ConversionOutcome};

/// Result type alias for pandoc-batch operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
