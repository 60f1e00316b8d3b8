//! Testing utilities and mock implementations.
//!
//! Lets callers exercise code built on [`Converter`](crate::converter::Converter)
//! without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffconduit_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::new();
//! converter.set_probe_result("/media/in.mkv", fixtures::media_info("/media/in.mkv")?).await;
//!
//! let result = converter.convert(&conversion, &cancel).await?;
//! assert_eq!(converter.conversion_count().await, 1);
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::converter::ConverterError;
    use crate::probe::{parse_probe_output, MediaInfo};

    /// `-show_streams` output of a two minute 1080p file with one video,
    /// two audio and one subtitle stream.
    pub const STREAMS_JSON: &str = r#"{"streams":[
        {"index":0,"codec_name":"h264","codec_type":"video","width":1920,"height":1080,
         "r_frame_rate":"24000/1001","pix_fmt":"yuv420p","duration":"120.000000",
         "bit_rate":"8000000","nb_frames":"2877","disposition":{"default":1,"forced":0}},
        {"index":1,"codec_name":"aac","codec_type":"audio","channels":6,"sample_rate":"48000",
         "duration":"120.000000","bit_rate":"384000","tags":{"language":"eng","title":"Surround"},
         "disposition":{"default":1,"forced":0}},
        {"index":2,"codec_name":"aac","codec_type":"audio","channels":2,"sample_rate":"48000",
         "bit_rate":"128000","tags":{"language":"ita"}},
        {"index":3,"codec_name":"subrip","codec_type":"subtitle","tags":{"language":"eng"},
         "disposition":{"default":0,"forced":1}}
    ]}"#;

    /// Container facts matching [`STREAMS_JSON`].
    pub const FORMAT_JSON: &str = r#"{"format":{"format_name":"matroska,webm",
        "size":"128000000","duration":"120.042000","bit_rate":"8530000",
        "tags":{"creation_time":"2024-03-01T12:00:00.000000Z"}}}"#;

    /// A populated [`MediaInfo`] for `path`, parsed from the fixtures above.
    pub fn media_info(path: impl AsRef<Path>) -> Result<MediaInfo, ConverterError> {
        parse_probe_output(path.as_ref(), STREAMS_JSON, FORMAT_JSON)
    }
}
