//! Conversion assembly, progress parsing and failure classification.
//!
//! A [`Conversion`] renders streams and global options into the argument list
//! of one ffmpeg invocation. While ffmpeg runs, each output line is fed to a
//! [`ProgressParser`]; once it exits, the accumulated output goes through
//! [`classify`] to decide whether and how the run failed.

mod builder;
mod classifier;
mod parameter;
mod progress;
mod types;

pub use builder::Conversion;
pub use classifier::{
    classify, Classification, FailureKind, Rule, EMPTY_OUTPUT_MARKER, RULES,
};
pub use parameter::{
    render_parameters, render_tokens, Parameter, ParameterPosition, ParameterSet,
};
pub use progress::{parse_elapsed, ConversionProgress, ProgressParser};
pub use types::{
    ConversionEvent, ConversionPreset, ConversionResult, HardwareAcceleration, VideoSyncMethod,
};
