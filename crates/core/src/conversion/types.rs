//! Conversion option enums, events and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::progress::ConversionProgress;
use crate::streams::VideoCodec;

/// x264/x265 style encoder preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPreset {
    UltraFast,
    SuperFast,
    VeryFast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    VerySlow,
}

impl ConversionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraFast => "ultrafast",
            Self::SuperFast => "superfast",
            Self::VeryFast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::VerySlow => "veryslow",
        }
    }
}

impl std::str::FromStr for ConversionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let preset = match s.to_ascii_lowercase().as_str() {
            "ultrafast" => Self::UltraFast,
            "superfast" => Self::SuperFast,
            "veryfast" => Self::VeryFast,
            "faster" => Self::Faster,
            "fast" => Self::Fast,
            "medium" => Self::Medium,
            "slow" => Self::Slow,
            "slower" => Self::Slower,
            "veryslow" => Self::VerySlow,
            other => return Err(format!("unknown preset: {}", other)),
        };
        Ok(preset)
    }
}

/// Video sync method (`-vsync`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSyncMethod {
    Passthrough,
    Cfr,
    Vfr,
    Drop,
    Auto,
}

impl VideoSyncMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Cfr => "cfr",
            Self::Vfr => "vfr",
            Self::Drop => "drop",
            Self::Auto => "auto",
        }
    }
}

/// Hardware decoding/encoding selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAcceleration {
    /// Accelerator name as listed by `ffmpeg -hwaccels` (`cuda`, `vaapi`, `auto`).
    pub accelerator: String,
    /// Hardware decoder, e.g. `h264_cuvid`.
    pub decoder: Option<String>,
    /// Encoder for the output video.
    pub encoder: Option<VideoCodec>,
    /// Device number; omitted when `None`.
    pub device: Option<u32>,
}

impl HardwareAcceleration {
    pub fn new(accelerator: impl Into<String>) -> Self {
        Self {
            accelerator: accelerator.into(),
            decoder: None,
            encoder: None,
            device: None,
        }
    }

    pub fn with_decoder(mut self, decoder: impl Into<String>) -> Self {
        self.decoder = Some(decoder.into());
        self
    }

    pub fn with_encoder(mut self, encoder: VideoCodec) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_device(mut self, device: u32) -> Self {
        self.device = Some(device);
        self
    }
}

/// Item delivered on the progress channel of a running conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    /// Parsed progress snapshot.
    Progress(ConversionProgress),
    /// Raw diagnostic line as printed by ffmpeg.
    Output(String),
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Exact argument string ffmpeg was started with.
    pub arguments: String,
    /// Output file, when the conversion declared one.
    pub output_path: Option<PathBuf>,
}

impl ConversionResult {
    /// Wall-clock time the run took.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!("Slow".parse::<ConversionPreset>(), Ok(ConversionPreset::Slow));
        assert_eq!(ConversionPreset::VeryFast.as_str(), "veryfast");
        assert!("warp".parse::<ConversionPreset>().is_err());
    }

    #[test]
    fn test_result_duration() {
        let start = Utc::now();
        let result = ConversionResult {
            start_time: start,
            end_time: start + chrono::Duration::milliseconds(1500),
            arguments: "-y -i in.mp4 out.mkv".into(),
            output_path: None,
        };
        assert_eq!(result.duration(), Duration::from_millis(1500));

        let backwards = ConversionResult {
            end_time: start - chrono::Duration::seconds(1),
            ..result
        };
        assert_eq!(backwards.duration(), Duration::ZERO);
    }
}
