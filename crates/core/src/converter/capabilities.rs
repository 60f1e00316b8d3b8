//! Encoder and hardware accelerator detection.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::config::ConverterConfig;
use crate::process::{ExitKind, OutputSource, ProcessRunner};

/// Name suffixes of hardware-backed encoders.
const HARDWARE_SUFFIXES: &[&str] = &[
    "_nvenc",
    "_qsv",
    "_amf",
    "_vaapi",
    "_videotoolbox",
    "_v4l2m2m",
    "_mf",
];

/// Encoders and accelerators reported by the local ffmpeg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// Video encoder names, e.g. `libx264`, `h264_nvenc`.
    pub video_encoders: Vec<String>,
    /// Audio encoder names.
    pub audio_encoders: Vec<String>,
    /// Hardware acceleration methods usable with `-hwaccel`.
    pub hwaccels: Vec<String>,
}

impl EncoderCapabilities {
    /// Detect capabilities by querying ffmpeg.
    ///
    /// A missing or failing ffmpeg yields empty capabilities.
    pub async fn detect(config: &ConverterConfig) -> Self {
        let encoders = query(config, "-encoders").await;
        let hwaccels = query(config, "-hwaccels").await;
        let mut caps = encoders.as_deref().map(parse_encoders).unwrap_or_default();
        caps.hwaccels = hwaccels.as_deref().map(parse_hwaccels).unwrap_or_default();
        caps
    }

    pub fn supports_encoder(&self, name: &str) -> bool {
        self.video_encoders.iter().any(|e| e == name)
            || self.audio_encoders.iter().any(|e| e == name)
    }

    pub fn supports_hwaccel(&self, name: &str) -> bool {
        self.hwaccels.iter().any(|h| h == name)
    }

    /// Hardware-backed video encoders.
    pub fn hardware_encoders(&self) -> impl Iterator<Item = &str> {
        self.video_encoders
            .iter()
            .map(String::as_str)
            .filter(|name| HARDWARE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
    }

    /// Check if any hardware encoder is available.
    pub fn has_hardware_encoder(&self) -> bool {
        self.hardware_encoders().next().is_some()
    }

    /// Check if NVENC is available.
    pub fn has_nvenc(&self) -> bool {
        self.hardware_encoders().any(|name| name.ends_with("_nvenc"))
    }
}

async fn query(config: &ConverterConfig, flag: &str) -> Option<String> {
    let args = vec!["-hide_banner".to_string(), flag.to_string()];
    let mut runner = ProcessRunner::new(&config.ffmpeg_path, args)
        .capture(OutputSource::Stdout)
        .with_timeout(config.timeout())
        .with_kill_grace(config.kill_grace());
    match runner.run(&CancellationToken::new(), |_, _| {}).await {
        Ok(output) if output.exit == ExitKind::Correct => Some(output.text),
        Ok(output) => {
            warn!(flag, exit = ?output.exit, "ffmpeg capability query failed");
            None
        }
        Err(e) => {
            warn!(flag, error = %e, "ffmpeg capability query failed");
            None
        }
    }
}

/// Parses the table printed by `ffmpeg -encoders`.
///
/// Rows follow a `------` separator and start with a six-letter flag field
/// whose first letter is the media type (`V`, `A` or `S`).
pub fn parse_encoders(text: &str) -> EncoderCapabilities {
    let mut caps = EncoderCapabilities::default();
    let rows = text
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1);
    for row in rows {
        let mut fields = row.split_whitespace();
        let (Some(flags), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };
        match flags.chars().next() {
            Some('V') => caps.video_encoders.push(name.to_string()),
            Some('A') => caps.audio_encoders.push(name.to_string()),
            _ => {}
        }
    }
    caps
}

/// Parses the list printed by `ffmpeg -hwaccels`.
pub fn parse_hwaccels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODERS: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 V....D hevc_vaapi           H.265/HEVC (VAAPI) (codec hevc)
 A....D aac                  AAC (Advanced Audio Coding)
 S..... srt                  SubRip subtitle
";

    #[test]
    fn test_default_capabilities() {
        let caps = EncoderCapabilities::default();
        assert!(!caps.has_hardware_encoder());
        assert!(!caps.supports_encoder("libx264"));
    }

    #[test]
    fn test_parse_encoders() {
        let caps = parse_encoders(ENCODERS);
        assert_eq!(caps.video_encoders, vec!["libx264", "h264_nvenc", "hevc_vaapi"]);
        assert_eq!(caps.audio_encoders, vec!["aac"]);
        assert!(caps.supports_encoder("aac"));
        assert!(!caps.supports_encoder("srt"));
        assert!(caps.has_nvenc());
        assert_eq!(
            caps.hardware_encoders().collect::<Vec<_>>(),
            vec!["h264_nvenc", "hevc_vaapi"]
        );
    }

    #[test]
    fn test_parse_hwaccels() {
        let accels = parse_hwaccels("Hardware acceleration methods:\nvdpau\ncuda\n\nvaapi\n");
        assert_eq!(accels, vec!["vdpau", "cuda", "vaapi"]);
        let caps = EncoderCapabilities {
            hwaccels: accels,
            ..Default::default()
        };
        assert!(caps.supports_hwaccel("cuda"));
        assert!(!caps.supports_hwaccel("qsv"));
    }

    #[tokio::test]
    async fn test_detect_without_ffmpeg_is_empty() {
        let config = ConverterConfig::with_paths(
            "/definitely/not/ffmpeg".into(),
            "/definitely/not/ffprobe".into(),
        );
        assert_eq!(
            EncoderCapabilities::detect(&config).await,
            EncoderCapabilities::default()
        );
    }
}
