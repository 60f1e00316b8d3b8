//! Subtitle stream.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{
    stream_metadata, to_path_buf, Disposition, InputOptions, Stream, StreamKind, SubtitleCodec,
};
use crate::conversion::Parameter;

#[derive(Debug, Clone, Default, PartialEq)]
struct SubtitleSettings {
    codec: Option<SubtitleCodec>,
    language: Option<String>,
    title: Option<String>,
    disposition: Disposition,
    input: InputOptions,
}

/// A subtitle stream of a media file, or a standalone subtitle file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStream {
    pub(crate) path: PathBuf,
    pub(crate) index: usize,
    pub(crate) codec_name: String,
    pub(crate) duration: Duration,
    pub(crate) language: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) default: bool,
    pub(crate) forced: bool,
    #[serde(skip)]
    settings: SubtitleSettings,
}

impl SubtitleStream {
    pub fn new(path: impl AsRef<Path>, index: usize) -> Self {
        Self {
            path: to_path_buf(path),
            index,
            codec_name: String::new(),
            duration: Duration::ZERO,
            language: None,
            title: None,
            default: false,
            forced: false,
            settings: SubtitleSettings::default(),
        }
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

    pub fn set_codec(mut self, codec: SubtitleCodec) -> Self {
        self.settings.codec = Some(codec);
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

    /// Demuxer for a standalone subtitle file, e.g. `srt`.
    pub fn set_input_format(mut self, format: impl Into<String>) -> Self {
        self.settings.input.format = Some(format.into());
        self
    }
}

impl Stream for SubtitleStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Subtitle
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
            params.push(Parameter::output("-c:s", codec.ffmpeg_name()));
        }
        if let Some(metadata) = stream_metadata(
            StreamKind::Subtitle,
            self.index,
            &[
                ("language", s.language.as_deref()),
                ("title", s.title.as_deref()),
            ],
        ) {
            params.push(metadata);
        }
        if let Some(disposition) = s.disposition.parameter(StreamKind::Subtitle, self.index) {
            params.push(disposition);
        }
        params
    }

    fn input_parameters(&self) -> Vec<Parameter> {
        self.settings.input.parameters()
    }

    /// Subtitles never drive the progress total.
    fn effective_duration(&self) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_rendering() {
        let stream = SubtitleStream::new("/subs/en.srt", 0)
            .set_codec(SubtitleCodec::MovText)
            .set_language("eng")
            .set_forced(true)
            .set_input_format("srt");
        assert_eq!(
            stream.build(),
            "-c:s mov_text -metadata:s:s:0 language=eng -disposition:s:0 +forced "
        );
        assert_eq!(stream.build_input_arguments(), "-f srt ");
        assert!(stream.is_forced());
        assert!(!stream.is_default());
    }

    #[test]
    fn test_probed_values_visible_until_overridden() {
        let mut stream = SubtitleStream::new("/in.mkv", 5);
        stream.language = Some("ger".into());
        stream.default = true;
        assert_eq!(stream.language(), Some("ger"));
        assert!(stream.is_default());

        let stream = stream.set_language("fre").set_default(false);
        assert_eq!(stream.language(), Some("fre"));
        assert!(!stream.is_default());
    }
}
