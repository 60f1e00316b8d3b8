//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use crate::conversion::{Conversion, ConversionEvent, ConversionResult};
use crate::probe::MediaInfo;

/// Something that can probe and convert media.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, ConverterError>;

    /// Runs a conversion to completion.
    async fn convert(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Runs a conversion, streaming output lines and progress to `events`.
    ///
    /// Events are sent without waiting; they are dropped while the channel
    /// is full. Closing the receiver cancels the run.
    async fn convert_with_progress(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
