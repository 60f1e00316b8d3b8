//! Video stream.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{
    effective_length, to_path_buf, Disposition, InputOptions, Split, Stream, StreamKind,
    VideoCodec,
};
use crate::conversion::{Parameter, ParameterPosition};

/// Rotation applied with the `transpose` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateDegrees {
    /// 90 degrees clockwise.
    Clockwise,
    /// 90 degrees counter-clockwise.
    CounterClockwise,
    /// 180 degrees.
    Invert,
}

impl RotateDegrees {
    fn filter(&self) -> &'static str {
        match self {
            Self::Clockwise => "transpose=1",
            Self::CounterClockwise => "transpose=2",
            Self::Invert => "transpose=2,transpose=2",
        }
    }
}

/// Common output frame sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSize {
    Qvga,
    Vga,
    Hd480,
    Hd720,
    Hd1080,
    Uhd2160,
}

impl VideoSize {
    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Qvga => (320, 240),
            Self::Vga => (640, 480),
            Self::Hd480 => (852, 480),
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Uhd2160 => (3840, 2160),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct BitrateRange {
    min: u64,
    max: u64,
    buffer: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct VideoSettings {
    codec: Option<VideoCodec>,
    size: Option<(u32, u32)>,
    rotate: Option<RotateDegrees>,
    framerate: Option<f64>,
    bitrate: Option<BitrateRange>,
    flags: Vec<String>,
    pixel_format: Option<String>,
    speed: Option<f64>,
    reverse: bool,
    frames: Option<u64>,
    split: Option<Split>,
    bitstream_filter: Option<String>,
    subtitles: Option<PathBuf>,
    disposition: Disposition,
    input: InputOptions,
}

/// A video stream of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    pub(crate) path: PathBuf,
    pub(crate) index: usize,
    pub(crate) codec_name: String,
    pub(crate) duration: Duration,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) framerate: f64,
    pub(crate) ratio: String,
    pub(crate) pixel_format: String,
    pub(crate) rotation: Option<i32>,
    pub(crate) bitrate: u64,
    pub(crate) default: bool,
    pub(crate) forced: bool,
    #[serde(skip)]
    settings: VideoSettings,
}

impl VideoStream {
    /// An empty stream to be configured for output.
    pub fn new(path: impl AsRef<Path>, index: usize) -> Self {
        Self {
            path: to_path_buf(path),
            index,
            codec_name: String::new(),
            duration: Duration::ZERO,
            width: 0,
            height: 0,
            framerate: 0.0,
            ratio: "0:0".to_string(),
            pixel_format: String::new(),
            rotation: None,
            bitrate: 0,
            default: false,
            forced: false,
            settings: VideoSettings::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames per second as probed.
    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    /// Display aspect ratio such as `16:9`.
    pub fn ratio(&self) -> &str {
        &self.ratio
    }

    pub fn pixel_format(&self) -> &str {
        &self.pixel_format
    }

    /// Rotation in degrees from the container tags or display matrix.
    pub fn rotation(&self) -> Option<i32> {
        self.rotation
    }

    /// Bits per second.
    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    pub fn is_default(&self) -> bool {
        self.settings.disposition.default.unwrap_or(self.default)
    }

    pub fn is_forced(&self) -> bool {
        self.settings.disposition.forced.unwrap_or(self.forced)
    }

    pub fn set_codec(mut self, codec: VideoCodec) -> Self {
        self.settings.codec = Some(codec);
        self
    }

    /// Stream copy without re-encoding.
    pub fn copy_stream(self) -> Self {
        self.set_codec(VideoCodec::Copy)
    }

    pub fn set_size(mut self, width: u32, height: u32) -> Self {
        self.settings.size = Some((width, height));
        self
    }

    pub fn set_size_preset(self, size: VideoSize) -> Self {
        let (width, height) = size.dimensions();
        self.set_size(width, height)
    }

    pub fn rotate(mut self, rotation: RotateDegrees) -> Self {
        self.settings.rotate = Some(rotation);
        self
    }

    pub fn set_framerate(mut self, framerate: f64) -> Self {
        self.settings.framerate = Some(framerate);
        self
    }

    /// Target bitrate with its rate-control bounds, all in bits per second.
    pub fn set_bitrate(mut self, min: u64, max: u64, buffer: u64) -> Self {
        self.settings.bitrate = Some(BitrateRange { min, max, buffer });
        self
    }

    /// Codec flags, rendered as `-flags +a+b`.
    pub fn set_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_pixel_format(mut self, format: impl Into<String>) -> Self {
        self.settings.pixel_format = Some(format.into());
        self
    }

    /// Playback speed multiplier; `2.0` plays twice as fast.
    pub fn change_speed(mut self, multiplier: f64) -> Self {
        self.settings.speed = Some(multiplier);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.settings.reverse = true;
        self
    }

    /// Input-side seek, applied before decoding.
    pub fn set_seek(mut self, seek: Duration) -> Self {
        self.settings.input.seek = Some(seek);
        self
    }

    pub fn set_output_frames_count(mut self, frames: u64) -> Self {
        self.settings.frames = Some(frames);
        self
    }

    /// Keeps `duration` of output starting at `start`.
    pub fn split(mut self, start: Duration, duration: Duration) -> Self {
        self.settings.split = Some(Split { start, duration });
        self
    }

    pub fn set_input_format(mut self, format: impl Into<String>) -> Self {
        self.settings.input.format = Some(format.into());
        self
    }

    pub fn set_bitstream_filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.bitstream_filter = Some(filter.into());
        self
    }

    /// Reads the input at its native frame rate (`-re`).
    pub fn use_native_input_read(mut self, enabled: bool) -> Self {
        self.settings.input.native_read = enabled;
        self
    }

    /// Loops the input; `-1` loops forever.
    pub fn set_stream_loop(mut self, count: i32) -> Self {
        self.settings.input.stream_loop = Some(count);
        self
    }

    /// Burns the subtitles of `path` into the picture.
    pub fn add_subtitles(mut self, path: impl AsRef<Path>) -> Self {
        self.settings.subtitles = Some(to_path_buf(path));
        self
    }

    pub fn set_default(mut self, default: bool) -> Self {
        self.settings.disposition.default = Some(default);
        self
    }

    pub fn set_forced(mut self, forced: bool) -> Self {
        self.settings.disposition.forced = Some(forced);
        self
    }

    fn filter_chain(&self) -> Vec<String> {
        let s = &self.settings;
        let mut filters = Vec::new();
        if let Some((width, height)) = s.size {
            filters.push(format!("scale={}:{}", width, height));
        }
        if let Some(rotate) = s.rotate {
            filters.push(rotate.filter().to_string());
        }
        if let Some(speed) = s.speed.filter(|speed| *speed > 0.0) {
            filters.push(format!("setpts={}*PTS", round3(1.0 / speed)));
        }
        if s.reverse {
            filters.push("reverse".to_string());
        }
        if let Some(subtitles) = &s.subtitles {
            filters.push(format!("subtitles={}", escape_filter_path(subtitles)));
        }
        filters
    }
}

impl Stream for VideoStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Video
    }

    fn index(&self) -> usize {
        self.index
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn codec(&self) -> &str {
        &self.codec_name
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn parameters(&self) -> Vec<Parameter> {
        let s = &self.settings;
        let mut params = Vec::new();

        if let Some(codec) = &s.codec {
            params.push(Parameter::output("-c:v", codec.ffmpeg_name()));
        }
        if let Some(range) = s.bitrate {
            params.push(Parameter::output("-b:v", range.min));
            params.push(Parameter::output("-maxrate", range.max));
            params.push(Parameter::output("-bufsize", range.buffer));
        }
        if let Some(framerate) = s.framerate {
            params.push(Parameter::output("-r", round3(framerate)));
        }
        if let Some(format) = &s.pixel_format {
            params.push(Parameter::output("-pix_fmt", format));
        }
        if !s.flags.is_empty() {
            let flags: String = s
                .flags
                .iter()
                .map(|f| {
                    if f.starts_with('+') || f.starts_with('-') {
                        f.clone()
                    } else {
                        format!("+{}", f)
                    }
                })
                .collect();
            params.push(Parameter::output("-flags", flags));
        }
        if let Some(frames) = s.frames {
            params.push(Parameter::output("-frames:v", frames));
        }
        if let Some(split) = s.split {
            params.extend(split.parameters());
        }
        if let Some(filter) = &s.bitstream_filter {
            params.push(Parameter::output("-bsf:v", filter));
        }
        let filters = self.filter_chain();
        if !filters.is_empty() {
            params.push(Parameter::from_tokens(
                ["-filter:v".to_string(), filters.join(",")],
                ParameterPosition::PostInput,
            ));
        }
        if let Some(disposition) = s.disposition.parameter(StreamKind::Video, self.index) {
            params.push(disposition);
        }
        params
    }

    fn input_parameters(&self) -> Vec<Parameter> {
        self.settings.input.parameters()
    }

    fn effective_duration(&self) -> Duration {
        effective_length(
            self.duration,
            self.settings.input.seek,
            self.settings.split,
            self.settings.speed,
        )
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Quotes a path for use as a filter option value.
fn escape_filter_path(path: &Path) -> String {
    let raw = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:");
    format!("'{}'", raw.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_renders_nothing() {
        let stream = VideoStream::new("/media/in.mp4", 0);
        assert_eq!(stream.build(), "");
        assert_eq!(stream.build_input_arguments(), "");
    }

    #[test]
    fn test_codec_and_size() {
        let stream = VideoStream::new("/media/in.mp4", 0)
            .set_codec(VideoCodec::H264)
            .set_size_preset(VideoSize::Hd720);
        assert_eq!(stream.build(), "-c:v libx264 -filter:v scale=1280:720 ");
    }

    #[test]
    fn test_filters_are_chained() {
        let stream = VideoStream::new("/media/in.mp4", 0)
            .rotate(RotateDegrees::Invert)
            .change_speed(2.0)
            .reverse();
        assert_eq!(
            stream.build(),
            "-filter:v transpose=2,transpose=2,setpts=0.5*PTS,reverse "
        );
    }

    #[test]
    fn test_bitrate_and_flags() {
        let stream = VideoStream::new("/media/in.mp4", 0)
            .set_bitrate(1_000_000, 2_000_000, 4_000_000)
            .set_flags(["loop", "-global_header"]);
        assert_eq!(
            stream.build(),
            "-b:v 1000000 -maxrate 2000000 -bufsize 4000000 -flags +loop-global_header "
        );
    }

    #[test]
    fn test_burned_subtitles_are_escaped() {
        let stream = VideoStream::new("/media/in.mp4", 0).add_subtitles("C:\\subs\\a.srt");
        let params = stream.parameters();
        assert_eq!(
            params[0].tokens(),
            &["-filter:v".to_string(), r"subtitles='C\:/subs/a.srt'".to_string()]
        );
    }

    #[test]
    fn test_input_parameters() {
        let stream = VideoStream::new("/media/in.mp4", 0)
            .set_seek(Duration::from_secs(90))
            .set_stream_loop(2);
        assert_eq!(
            stream.build_input_arguments(),
            "-stream_loop 2 -ss 0:01:30.000 "
        );
    }

    #[test]
    fn test_disposition_uses_index() {
        let stream = VideoStream::new("/media/in.mp4", 3).set_default(true);
        assert_eq!(stream.build(), "-disposition:v:3 +default ");
        assert!(stream.is_default());
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let stream = VideoStream::new("/media/in.mp4", 0)
            .set_codec(VideoCodec::Vp9)
            .split(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(stream.build(), stream.build());
        assert_eq!(stream.parameters(), stream.clone().parameters());
    }
}
