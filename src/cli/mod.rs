//! Command-line interface for pandoc-batch
//!
//! clap parses the arguments, [`commands`] holds one module per subcommand and
//! [`Output`] keeps the console formatting consistent between them.

pub mod args;
pub mod commands;
mod output;

pub use commands::Cli;
pub use output::Output;
