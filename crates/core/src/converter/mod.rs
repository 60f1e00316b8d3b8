//! Converter facade tying the pipeline together.
//!
//! [`FfmpegConverter`] renders a [`Conversion`](crate::conversion::Conversion)
//! into an ffmpeg command line, runs it through the process runner, feeds
//! every output line to the progress parser and classifies the diagnostics
//! once the process ends.
//!
//! # Example
//!
//! ```ignore
//! use ffconduit_core::converter::{Converter, ConverterConfig, FfmpegConverter};
//! use ffconduit_core::conversion::Conversion;
//!
//! let converter = FfmpegConverter::new(ConverterConfig::default());
//! converter.validate().await?;
//!
//! let info = converter.probe(Path::new("/media/in.mkv"), &cancel).await?;
//! let conversion = Conversion::new()
//!     .add_streams(info.streams())
//!     .set_output("/media/out.mp4");
//! let result = converter.convert(&conversion, &cancel).await?;
//! println!("Converted in {:?}", result.duration());
//! ```

mod capabilities;
mod config;
mod error;
mod ffmpeg;
mod tools;
mod traits;

pub use capabilities::{parse_encoders, parse_hwaccels, EncoderCapabilities};
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use tools::{ExecutableProvider, LocalExecutables, ToolPaths};
pub use traits::Converter;
