//! Codec selections and codec-specific rendering.

use serde::{Deserialize, Serialize};

/// Video encoder selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC (libx264)
    H264,
    /// H.265 / HEVC (libx265)
    Hevc,
    /// VP8 (libvpx)
    Vp8,
    /// VP9 (libvpx-vp9)
    Vp9,
    /// AV1 (libaom-av1)
    Av1,
    /// MPEG-4 Part 2
    Mpeg4,
    /// Motion JPEG
    Mjpeg,
    /// PNG (image sequences, thumbnails)
    Png,
    /// Stream copy, no re-encoding
    Copy,
    /// Any other encoder name understood by ffmpeg
    Custom(String),
}

impl VideoCodec {
    /// The ffmpeg encoder name.
    pub fn ffmpeg_name(&self) -> &str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
            Self::Vp8 => "libvpx",
            Self::Vp9 => "libvpx-vp9",
            Self::Av1 => "libaom-av1",
            Self::Mpeg4 => "mpeg4",
            Self::Mjpeg => "mjpeg",
            Self::Png => "png",
            Self::Copy => "copy",
            Self::Custom(name) => name,
        }
    }
}

/// Audio encoder selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Advanced Audio Coding
    Aac,
    /// MPEG Audio Layer III (libmp3lame)
    Mp3,
    /// Opus (libopus)
    Opus,
    /// Vorbis (libvorbis)
    Vorbis,
    /// Free Lossless Audio Codec
    Flac,
    /// Dolby Digital
    Ac3,
    /// Dolby Digital Plus
    Eac3,
    /// Apple Lossless
    Alac,
    /// 16-bit little-endian PCM
    PcmS16le,
    /// Stream copy, no re-encoding
    Copy,
    /// Any other encoder name understood by ffmpeg
    Custom(String),
}

impl AudioCodec {
    /// The ffmpeg encoder name.
    pub fn ffmpeg_name(&self) -> &str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
            Self::Flac => "flac",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Alac => "alac",
            Self::PcmS16le => "pcm_s16le",
            Self::Copy => "copy",
            Self::Custom(name) => name,
        }
    }

    /// Whether this codec is lossless.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Flac | Self::Alac | Self::PcmS16le)
    }
}

/// Subtitle encoder selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleCodec {
    /// SubRip
    Srt,
    /// Advanced SubStation Alpha
    Ass,
    /// WebVTT
    WebVtt,
    /// MP4 timed text
    MovText,
    /// DVD bitmap subtitles
    DvdSub,
    /// Stream copy, no re-encoding
    Copy,
    /// Any other encoder name understood by ffmpeg
    Custom(String),
}

impl SubtitleCodec {
    /// The ffmpeg encoder name.
    pub fn ffmpeg_name(&self) -> &str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::WebVtt => "webvtt",
            Self::MovText => "mov_text",
            Self::DvdSub => "dvdsub",
            Self::Copy => "copy",
            Self::Custom(name) => name,
        }
    }
}

/// How an audio encoder's output rate is controlled.
///
/// Each variant renders its own flag, so stream rendering never has to
/// inspect which kind of option it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum AudioRateControl {
    /// Constant bitrate in bits per second (`-b:a`).
    ConstantBitrate(u64),
    /// Encoder-specific VBR quality scale (`-q:a`).
    VariableQuality(u8),
    /// Compression effort for lossless encoders (`-compression_level`).
    CompressionLevel(u8),
}

impl AudioRateControl {
    /// Renders the flag/value tokens.
    pub fn render(&self) -> [String; 2] {
        match self {
            Self::ConstantBitrate(bps) => ["-b:a".to_string(), bps.to_string()],
            Self::VariableQuality(q) => ["-q:a".to_string(), q.to_string()],
            Self::CompressionLevel(level) => ["-compression_level".to_string(), level.to_string()],
        }
    }
}
