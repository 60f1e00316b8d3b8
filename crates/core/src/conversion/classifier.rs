//! Maps ffmpeg diagnostic text to failure kinds.
//!
//! The table is evaluated top to bottom and the first matching rule wins.
//! Some signatures are routinely printed for recoverable glitches; those
//! rules only fire when ffmpeg also reports that it produced no output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confirmation printed by ffmpeg when nothing was written.
pub const EMPTY_OUTPUT_MARKER: &str = "Output file is empty";

/// Typed category of a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConversionFailed,
    UnknownDecoder,
    HardwareAcceleratorNotFound,
    NoSuitableOutputFormat,
    InvalidBitstreamFilter,
}

impl FailureKind {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConversionFailed => "conversion_failed",
            Self::UnknownDecoder => "unknown_decoder",
            Self::HardwareAcceleratorNotFound => "hardware_accelerator_not_found",
            Self::NoSuitableOutputFormat => "no_suitable_output_format",
            Self::InvalidBitstreamFilter => "invalid_bitstream_filter",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Substring searched for in the accumulated output.
    pub signature: &'static str,
    /// Whether [`EMPTY_OUTPUT_MARKER`] must also be present.
    pub requires_empty_output: bool,
    pub kind: FailureKind,
}

const fn rule(signature: &'static str, requires_empty_output: bool, kind: FailureKind) -> Rule {
    Rule {
        signature,
        requires_empty_output,
        kind,
    }
}

/// Rules in priority order.
pub const RULES: &[Rule] = &[
    rule("Invalid NAL unit size", false, FailureKind::ConversionFailed),
    rule("Packet mismatch", true, FailureKind::ConversionFailed),
    rule("asf_read_pts failed", true, FailureKind::UnknownDecoder),
    rule(
        "Missing key frame while searching for timestamp",
        true,
        FailureKind::UnknownDecoder,
    ),
    rule(
        "Old interlaced mode is not supported",
        true,
        FailureKind::UnknownDecoder,
    ),
    rule("mpeg1video", true, FailureKind::UnknownDecoder),
    rule(
        "Frame rate very high for a muxer not efficiently supporting it",
        true,
        FailureKind::UnknownDecoder,
    ),
    rule(
        "multiple fourcc not supported",
        false,
        FailureKind::UnknownDecoder,
    ),
    rule("Unknown decoder", false, FailureKind::UnknownDecoder),
    rule(
        "Failed to open codec in avformat_find_stream_info",
        false,
        FailureKind::UnknownDecoder,
    ),
    rule(
        "Unrecognized hwaccel: ",
        false,
        FailureKind::HardwareAcceleratorNotFound,
    ),
    rule(
        "Unable to find a suitable output format",
        false,
        FailureKind::NoSuitableOutputFormat,
    ),
    rule(
        "is not supported by the bitstream filter",
        false,
        FailureKind::InvalidBitstreamFilter,
    ),
];

/// Result of a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: FailureKind,
    /// The signature that matched.
    pub signature: &'static str,
}

/// Classifies accumulated diagnostic text; `None` when no rule matches.
pub fn classify(output: &str) -> Option<Classification> {
    let output_empty = output.contains(EMPTY_OUTPUT_MARKER);
    RULES
        .iter()
        .find(|rule| {
            output.contains(rule.signature) && (!rule.requires_empty_output || output_empty)
        })
        .map(|rule| Classification {
            kind: rule.kind,
            signature: rule.signature,
        })
}
