//! Structured driver for ffmpeg and ffprobe.
//!
//! Streams are described with [`streams`], combined into a
//! [`Conversion`](conversion::Conversion) that renders the command line, and
//! run by a [`Converter`](converter::Converter) which reports progress and
//! turns ffmpeg's diagnostics into typed errors. [`probe`] reads existing
//! files into populated stream objects.

pub mod config;
pub mod conversion;
pub mod converter;
pub mod metrics;
pub mod probe;
pub mod process;
pub mod streams;
pub mod testing;
pub mod timecode;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, LoggingConfig,
};
pub use conversion::{
    Conversion, ConversionEvent, ConversionPreset, ConversionProgress, ConversionResult,
    HardwareAcceleration, ParameterPosition, VideoSyncMethod,
};
pub use converter::{
    Converter, ConverterConfig, ConverterError, EncoderCapabilities, ExecutableProvider,
    FfmpegConverter, LocalExecutables, ToolPaths,
};
pub use probe::{MediaInfo, Prober};
pub use streams::{
    AudioCodec, AudioStream, MediaStream, Stream, SubtitleCodec, SubtitleStream, VideoCodec,
    VideoStream,
};
