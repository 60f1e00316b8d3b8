//! In-memory model of media streams.
//!
//! A stream is either read from a file by the probe parser (populated with
//! the properties ffprobe reported) or constructed with `new(path, index)`
//! to describe an output. Setters only record intent and return the updated
//! value; nothing is checked against ffmpeg's capabilities until ffmpeg runs.
//!
//! Rendering is split between the pre-input flags of a stream
//! ([`Stream::input_parameters`]) and its output fragment
//! ([`Stream::parameters`]). The conversion assembler places them around the
//! `-i` declarations.

mod audio;
mod codec;
mod subtitle;
mod video;

pub use audio::AudioStream;
pub use codec::{AudioCodec, AudioRateControl, SubtitleCodec, VideoCodec};
pub use subtitle::SubtitleStream;
pub use video::{RotateDegrees, VideoSize, VideoStream};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conversion::{render_parameters, Parameter, ParameterPosition};
use crate::timecode::format_time;

/// The three kinds of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    /// ffmpeg stream specifier letter.
    pub fn specifier(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
            Self::Subtitle => "s",
        }
    }
}

/// Behaviour shared by every stream variant.
pub trait Stream {
    fn kind(&self) -> StreamKind;

    /// Zero-based position of the stream within its source container.
    fn index(&self) -> usize;

    /// Source file (or URL) the stream is read from.
    fn path(&self) -> &Path;

    /// Codec name as reported by ffprobe; empty for streams built by hand.
    fn codec(&self) -> &str;

    fn duration(&self) -> Duration;

    /// Output-side parameters of this stream.
    fn parameters(&self) -> Vec<Parameter>;

    /// Parameters that must precede this stream's `-i` declaration.
    fn input_parameters(&self) -> Vec<Parameter>;

    /// Media length this stream contributes to the output, used as the
    /// progress total.
    fn effective_duration(&self) -> Duration {
        self.duration()
    }

    /// Rendered output fragment.
    fn build(&self) -> String {
        render_parameters(&self.parameters())
    }

    /// Rendered pre-input fragment, empty when no input flags apply.
    fn build_input_arguments(&self) -> String {
        render_parameters(&self.input_parameters())
    }

    /// The single source path, as a sequence.
    fn source(&self) -> std::iter::Once<&Path> {
        std::iter::once(self.path())
    }
}

/// Any stream, for heterogeneous lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaStream {
    Video(VideoStream),
    Audio(AudioStream),
    Subtitle(SubtitleStream),
}

macro_rules! delegate {
    ($self:ident, $s:ident => $e:expr) => {
        match $self {
            MediaStream::Video($s) => $e,
            MediaStream::Audio($s) => $e,
            MediaStream::Subtitle($s) => $e,
        }
    };
}

impl Stream for MediaStream {
    fn kind(&self) -> StreamKind {
        delegate!(self, s => s.kind())
    }

    fn index(&self) -> usize {
        delegate!(self, s => s.index())
    }

    fn path(&self) -> &Path {
        delegate!(self, s => s.path())
    }

    fn codec(&self) -> &str {
        delegate!(self, s => s.codec())
    }

    fn duration(&self) -> Duration {
        delegate!(self, s => s.duration())
    }

    fn parameters(&self) -> Vec<Parameter> {
        delegate!(self, s => s.parameters())
    }

    fn input_parameters(&self) -> Vec<Parameter> {
        delegate!(self, s => s.input_parameters())
    }

    fn effective_duration(&self) -> Duration {
        delegate!(self, s => s.effective_duration())
    }
}

impl From<VideoStream> for MediaStream {
    fn from(stream: VideoStream) -> Self {
        Self::Video(stream)
    }
}

impl From<AudioStream> for MediaStream {
    fn from(stream: AudioStream) -> Self {
        Self::Audio(stream)
    }
}

impl From<SubtitleStream> for MediaStream {
    fn from(stream: SubtitleStream) -> Self {
        Self::Subtitle(stream)
    }
}

/// Pre-input flags that apply to the input a stream is read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct InputOptions {
    pub(crate) format: Option<String>,
    pub(crate) native_read: bool,
    pub(crate) stream_loop: Option<i32>,
    pub(crate) seek: Option<Duration>,
}

impl InputOptions {
    pub(crate) fn parameters(&self) -> Vec<Parameter> {
        let mut params = Vec::new();
        if let Some(format) = &self.format {
            params.push(Parameter::input("-f", format));
        }
        if self.native_read {
            params.push(Parameter::from_tokens(["-re"], ParameterPosition::PreInput));
        }
        if let Some(count) = self.stream_loop {
            params.push(Parameter::input("-stream_loop", count));
        }
        if let Some(seek) = self.seek {
            params.push(Parameter::input("-ss", format_time(seek)));
        }
        params
    }
}

/// Output-side trim: start offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Split {
    pub(crate) start: Duration,
    pub(crate) duration: Duration,
}

impl Split {
    pub(crate) fn parameters(&self) -> [Parameter; 2] {
        [
            Parameter::output("-ss", format_time(self.start)),
            Parameter::output("-t", format_time(self.duration)),
        ]
    }
}

/// Explicit default/forced disposition changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Disposition {
    pub(crate) default: Option<bool>,
    pub(crate) forced: Option<bool>,
}

impl Disposition {
    /// `-disposition:<k>:<index> +default-forced`, or nothing when unchanged.
    pub(crate) fn parameter(&self, kind: StreamKind, index: usize) -> Option<Parameter> {
        let mut value = String::new();
        for (name, flag) in [("default", self.default), ("forced", self.forced)] {
            if let Some(on) = flag {
                value.push(if on { '+' } else { '-' });
                value.push_str(name);
            }
        }
        if value.is_empty() {
            return None;
        }
        Some(Parameter::output(
            &format!("-disposition:{}:{}", kind.specifier(), index),
            value,
        ))
    }
}

/// `-metadata:s:<k>:<index> key=value` for each present entry, grouped into
/// one parameter so entries of the same stream do not replace each other.
pub(crate) fn stream_metadata(
    kind: StreamKind,
    index: usize,
    entries: &[(&str, Option<&str>)],
) -> Option<Parameter> {
    let flag = format!("-metadata:s:{}:{}", kind.specifier(), index);
    let tokens: Vec<String> = entries
        .iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .flat_map(|(key, value)| [flag.clone(), format!("{}={}", key, value)])
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(Parameter::from_tokens(tokens, ParameterPosition::PostInput))
}

/// Length left after seeking and trimming, scaled by a playback speed.
pub(crate) fn effective_length(
    duration: Duration,
    seek: Option<Duration>,
    split: Option<Split>,
    speed: Option<f64>,
) -> Duration {
    let base = match split {
        Some(split) => split.duration,
        None => duration.saturating_sub(seek.unwrap_or_default()),
    };
    match speed {
        Some(speed) if speed > 0.0 => Duration::from_secs_f64(base.as_secs_f64() / speed),
        _ => base,
    }
}

pub(crate) fn to_path_buf(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref().to_path_buf()
}
