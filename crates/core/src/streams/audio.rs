//! Audio stream.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{
    effective_length, stream_metadata, to_path_buf, AudioCodec, AudioRateControl, Disposition,
    InputOptions, Split, Stream, StreamKind,
};
use crate::conversion::{Parameter, ParameterPosition};

#[derive(Debug, Clone, Default, PartialEq)]
struct AudioSettings {
    codec: Option<AudioCodec>,
    rate_control: Option<AudioRateControl>,
    channels: Option<u32>,
    sample_rate: Option<u32>,
    speed: Option<f64>,
    reverse: bool,
    split: Option<Split>,
    bitstream_filter: Option<String>,
    language: Option<String>,
    title: Option<String>,
    disposition: Disposition,
    input: InputOptions,
}

/// An audio stream of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    pub(crate) path: PathBuf,
    pub(crate) index: usize,
    pub(crate) codec_name: String,
    pub(crate) duration: Duration,
    pub(crate) channels: u32,
    pub(crate) sample_rate: u32,
    pub(crate) bitrate: u64,
    pub(crate) language: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) default: bool,
    pub(crate) forced: bool,
    #[serde(skip)]
    settings: AudioSettings,
}

impl AudioStream {
    /// An empty stream to be configured for output.
    pub fn new(path: impl AsRef<Path>, index: usize) -> Self {
        Self {
            path: to_path_buf(path),
            index,
            codec_name: String::new(),
            duration: Duration::ZERO,
            channels: 0,
            sample_rate: 0,
            bitrate: 0,
            language: None,
            title: None,
            default: false,
            forced: false,
            settings: AudioSettings::default(),
        }
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bits per second.
    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    pub fn language(&self) -> Option<&str> {
        self.settings
            .language
            .as_deref()
            .or(self.language.as_deref())
    }

    pub fn title(&self) -> Option<&str> {
        self.settings.title.as_deref().or(self.title.as_deref())
    }

    pub fn is_default(&self) -> bool {
        self.settings.disposition.default.unwrap_or(self.default)
    }

    pub fn is_forced(&self) -> bool {
        self.settings.disposition.forced.unwrap_or(self.forced)
    }

    pub fn set_codec(mut self, codec: AudioCodec) -> Self {
        self.settings.codec = Some(codec);
        self
    }

    pub fn copy_stream(self) -> Self {
        self.set_codec(AudioCodec::Copy)
    }

    pub fn set_rate_control(mut self, rate_control: AudioRateControl) -> Self {
        self.settings.rate_control = Some(rate_control);
        self
    }

    /// Constant bitrate in bits per second.
    pub fn set_bitrate(self, bitrate: u64) -> Self {
        self.set_rate_control(AudioRateControl::ConstantBitrate(bitrate))
    }

    pub fn set_channels(mut self, channels: u32) -> Self {
        self.settings.channels = Some(channels);
        self
    }

    pub fn set_sample_rate(mut self, sample_rate: u32) -> Self {
        self.settings.sample_rate = Some(sample_rate);
        self
    }

    /// Tempo multiplier; pitch is preserved.
    pub fn change_speed(mut self, multiplier: f64) -> Self {
        self.settings.speed = Some(multiplier);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.settings.reverse = true;
        self
    }

    pub fn set_seek(mut self, seek: Duration) -> Self {
        self.settings.input.seek = Some(seek);
        self
    }

    pub fn split(mut self, start: Duration, duration: Duration) -> Self {
        self.settings.split = Some(Split { start, duration });
        self
    }

    pub fn set_language(mut self, language: impl Into<String>) -> Self {
        self.settings.language = Some(language.into());
        self
    }

    pub fn set_title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = Some(title.into());
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

    pub fn set_input_format(mut self, format: impl Into<String>) -> Self {
        self.settings.input.format = Some(format.into());
        self
    }

    pub fn set_bitstream_filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.bitstream_filter = Some(filter.into());
        self
    }

    pub fn use_native_input_read(mut self, enabled: bool) -> Self {
        self.settings.input.native_read = enabled;
        self
    }

    pub fn set_stream_loop(mut self, count: i32) -> Self {
        self.settings.input.stream_loop = Some(count);
        self
    }
}

impl Stream for AudioStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Audio
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
            params.push(Parameter::output("-c:a", codec.ffmpeg_name()));
        }
        if let Some(rate_control) = s.rate_control {
            params.push(Parameter::from_tokens(
                rate_control.render(),
                ParameterPosition::PostInput,
            ));
        }
        if let Some(channels) = s.channels {
            params.push(Parameter::output("-ac", channels));
        }
        if let Some(sample_rate) = s.sample_rate {
            params.push(Parameter::output("-ar", sample_rate));
        }
        if let Some(split) = s.split {
            params.extend(split.parameters());
        }
        if let Some(filter) = &s.bitstream_filter {
            params.push(Parameter::output("-bsf:a", filter));
        }

        let mut filters = Vec::new();
        if let Some(speed) = s.speed.filter(|speed| *speed > 0.0) {
            filters.push(format!("atempo={}", (speed * 1000.0).round() / 1000.0));
        }
        if s.reverse {
            filters.push("areverse".to_string());
        }
        if !filters.is_empty() {
            params.push(Parameter::output("-filter:a", filters.join(",")));
        }

        if let Some(metadata) = stream_metadata(
            StreamKind::Audio,
            self.index,
            &[
                ("language", s.language.as_deref()),
                ("title", s.title.as_deref()),
            ],
        ) {
            params.push(metadata);
        }
        if let Some(disposition) = s.disposition.parameter(StreamKind::Audio, self.index) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_control_variants() {
        let cbr = AudioStream::new("/in.mkv", 1)
            .set_codec(AudioCodec::Aac)
            .set_bitrate(128_000);
        assert_eq!(cbr.build(), "-c:a aac -b:a 128000 ");

        let vbr = AudioStream::new("/in.mkv", 1)
            .set_codec(AudioCodec::Mp3)
            .set_rate_control(AudioRateControl::VariableQuality(2));
        assert_eq!(vbr.build(), "-c:a libmp3lame -q:a 2 ");
    }

    #[test]
    fn test_later_rate_control_replaces_earlier() {
        let stream = AudioStream::new("/in.mkv", 0)
            .set_bitrate(96_000)
            .set_rate_control(AudioRateControl::CompressionLevel(5));
        assert_eq!(stream.build(), "-compression_level 5 ");
    }

    #[test]
    fn test_language_and_title_addressed_by_index() {
        let stream = AudioStream::new("/in.mkv", 2)
            .set_language("pol")
            .set_title("Commentary")
            .set_default(true);
        assert_eq!(
            stream.build(),
            "-metadata:s:a:2 language=pol -metadata:s:a:2 title=Commentary -disposition:a:2 +default "
        );
        assert_eq!(stream.language(), Some("pol"));
    }

    #[test]
    fn test_speed_and_reverse_filters() {
        let stream = AudioStream::new("/in.mkv", 0).change_speed(1.5).reverse();
        assert_eq!(stream.build(), "-filter:a atempo=1.5,areverse ");
        let mut probed = stream.clone();
        probed.duration = Duration::from_secs(30);
        assert_eq!(probed.effective_duration(), Duration::from_secs(20));
    }

    #[test]
    fn test_channels_sample_rate_and_split() {
        let stream = AudioStream::new("/in.mkv", 0)
            .set_channels(2)
            .set_sample_rate(48_000)
            .split(Duration::from_secs(10), Duration::from_millis(2_500));
        assert_eq!(
            stream.build(),
            "-ac 2 -ar 48000 -ss 0:00:10.000 -t 0:00:02.500 "
        );
    }
}
