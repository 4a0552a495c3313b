//! Failure taxonomy for a single conversion
//!
//! These never escape the batch path; they are folded into a failed
//! [`ConversionOutcome`](crate::job::ConversionOutcome) with the `Display`
//! text as the error message.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Pandoc is not available on this system")]
    ToolUnavailable,

    #[error("Input file does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Pandoc executable not found: {}", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Pandoc conversion timed out after {}", describe_duration(.0))]
    TimedOut(Duration),

    #[error("Conversion failed: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Service error: {0}")]
    Service(String),
}

/// "5 minutes", "1 minute", "45 seconds"
pub(crate) fn describe_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    } else if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_for_default_limit() {
        let err = ConversionError::TimedOut(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Pandoc conversion timed out after 5 minutes");
    }

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(&Duration::from_secs(60)), "1 minute");
        assert_eq!(describe_duration(&Duration::from_secs(90)), "90 seconds");
        assert_eq!(describe_duration(&Duration::from_secs(1)), "1 second");
    }

    #[test]
    fn test_input_missing_mentions_path() {
        let err = ConversionError::InputMissing(PathBuf::from("/tmp/nope.md"));
        assert!(err.to_string().contains("does not exist"));
        assert!(err.to_string().contains("nope.md"));
    }
}
