//! Raw ffprobe JSON shapes.
//!
//! ffprobe prints most numbers as strings (`"duration": "12.5"`) but a few
//! as JSON numbers; [`Numeric`] accepts either.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

pub(crate) fn as_f64(value: &Option<Numeric>) -> Option<f64> {
    value.as_ref().and_then(Numeric::as_f64)
}

/// Output of `-show_streams`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamsOutput {
    #[serde(default)]
    pub streams: Vec<RawStream>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawStream {
    #[serde(default)]
    pub index: usize,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<String>,
    pub duration: Option<Numeric>,
    pub bit_rate: Option<Numeric>,
    pub channels: Option<u32>,
    pub sample_rate: Option<Numeric>,
    pub pix_fmt: Option<String>,
    pub nb_frames: Option<Numeric>,
    #[serde(default)]
    pub tags: RawStreamTags,
    #[serde(default)]
    pub disposition: RawDisposition,
    #[serde(default)]
    pub side_data_list: Vec<RawSideData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawStreamTags {
    pub language: Option<String>,
    pub title: Option<String>,
    pub rotate: Option<Numeric>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDisposition {
    #[serde(default)]
    pub default: u8,
    #[serde(default)]
    pub forced: u8,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSideData {
    pub rotation: Option<Numeric>,
}

/// Output of `-show_entries format=...`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FormatOutput {
    #[serde(default)]
    pub format: RawFormat,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFormat {
    pub format_name: Option<String>,
    pub size: Option<Numeric>,
    pub duration: Option<Numeric>,
    pub bit_rate: Option<Numeric>,
    #[serde(default)]
    pub tags: RawFormatTags,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFormatTags {
    pub creation_time: Option<String>,
}
