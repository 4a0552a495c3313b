//! Everything that touches the pandoc executable
//!
//! - [`locator`] finds the binary and probes its version
//! - [`runner`] turns a job into a command line and runs it under a timeout
//! - [`service`] combines both behind [`Converter::convert`]

pub mod locator;
pub mod process;
pub mod runner;
pub mod service;

pub use locator::{LocatorConfig, PandocInfo, PandocLocator};
pub use runner::{PandocRunner, RunnerOptions};
pub use service::{ConversionService, Converter};
