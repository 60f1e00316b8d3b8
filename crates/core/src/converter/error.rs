//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::conversion::{Classification, FailureKind};

/// Errors that can occur while probing or converting.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The source is missing or is not a readable media file.
    #[error("Invalid input {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// ffmpeg could not decode one of the inputs.
    #[error("Unknown decoder or unsupported input stream")]
    UnknownDecoder { output: String, arguments: String },

    /// The requested hardware accelerator is not available.
    #[error("Hardware accelerator not found")]
    HardwareAcceleratorNotFound { output: String, arguments: String },

    /// ffmpeg could not infer an output container.
    #[error("No suitable output format found")]
    NoSuitableOutputFormat { output: String, arguments: String },

    /// A bitstream filter was applied to a stream it does not support.
    #[error("Invalid bitstream filter")]
    InvalidBitstreamFilter { output: String, arguments: String },

    /// Conversion failed for a reason without a more specific kind.
    #[error("Conversion failed (exit code {exit_code:?})")]
    ConversionFailed {
        output: String,
        arguments: String,
        exit_code: Option<i32>,
    },

    /// The run was cancelled and its process terminated.
    #[error("Conversion cancelled")]
    Cancelled,

    /// A process runner was started a second time.
    #[error("Process runner has already been started")]
    AlreadyStarted,

    /// The conversion object is already being run.
    #[error("Conversion is already in progress")]
    MultipleConversionInProgress,

    /// Executable not found at the configured path.
    #[error("Executable not found at path: {path}")]
    ExecutableNotFound { path: PathBuf },

    /// The process could not be spawned.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run timed out.
    #[error("Run timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse ffprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// An argument string could not be split into tokens.
    #[error("Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    /// I/O error while supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates an invalid input error.
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a generic conversion failure.
    pub fn conversion_failed(
        output: impl Into<String>,
        arguments: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ConversionFailed {
            output: output.into(),
            arguments: arguments.into(),
            exit_code,
        }
    }

    /// Turns a matched classification rule into the typed failure it selects.
    ///
    /// The full diagnostic text and the rendered arguments are kept verbatim.
    pub fn from_classification(
        classification: &Classification,
        output: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let output = output.into();
        let arguments = arguments.into();
        match classification.kind {
            FailureKind::UnknownDecoder => Self::UnknownDecoder { output, arguments },
            FailureKind::HardwareAcceleratorNotFound => {
                Self::HardwareAcceleratorNotFound { output, arguments }
            }
            FailureKind::NoSuitableOutputFormat => {
                Self::NoSuitableOutputFormat { output, arguments }
            }
            FailureKind::InvalidBitstreamFilter => {
                Self::InvalidBitstreamFilter { output, arguments }
            }
            FailureKind::ConversionFailed => Self::ConversionFailed {
                output,
                arguments,
                exit_code: None,
            },
        }
    }

    /// The failure kind for errors produced by output classification.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::UnknownDecoder { .. } => Some(FailureKind::UnknownDecoder),
            Self::HardwareAcceleratorNotFound { .. } => {
                Some(FailureKind::HardwareAcceleratorNotFound)
            }
            Self::NoSuitableOutputFormat { .. } => Some(FailureKind::NoSuitableOutputFormat),
            Self::InvalidBitstreamFilter { .. } => Some(FailureKind::InvalidBitstreamFilter),
            Self::ConversionFailed { .. } => Some(FailureKind::ConversionFailed),
            _ => None,
        }
    }

    /// The captured diagnostic text and argument string, when the error carries them.
    pub fn diagnostics(&self) -> Option<(&str, &str)> {
        match self {
            Self::UnknownDecoder { output, arguments }
            | Self::HardwareAcceleratorNotFound { output, arguments }
            | Self::NoSuitableOutputFormat { output, arguments }
            | Self::InvalidBitstreamFilter { output, arguments }
            | Self::ConversionFailed {
                output, arguments, ..
            } => Some((output.as_str(), arguments.as_str())),
            _ => None,
        }
    }

    /// Whether the run ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::classify;

    #[test]
    fn test_from_classification_keeps_diagnostics() {
        let output = "Unrecognized hwaccel: xyz\n";
        let classification = classify(output).unwrap();
        let err = ConverterError::from_classification(&classification, output, "-hwaccel xyz");

        assert!(matches!(err, ConverterError::HardwareAcceleratorNotFound { .. }));
        assert_eq!(err.diagnostics(), Some((output, "-hwaccel xyz")));
        assert_eq!(
            err.failure_kind(),
            Some(FailureKind::HardwareAcceleratorNotFound)
        );
    }

    #[test]
    fn test_cancelled_is_not_a_failure_kind() {
        let err = ConverterError::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.failure_kind().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(ConverterError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(!ConverterError::invalid_input("/a.mkv", "missing").is_retryable());
    }
}
