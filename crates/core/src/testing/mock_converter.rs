//! Mock converter for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use super::fixtures;
use crate::conversion::{Conversion, ConversionEvent, ConversionProgress, ConversionResult};
use crate::converter::{Converter, ConverterError};
use crate::probe::MediaInfo;
use crate::timecode::format_time;

/// A recorded conversion for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// Rendered argument string of the submitted conversion.
    pub arguments: String,
    pub output_path: Option<PathBuf>,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversions for assertions
/// - Simulate success/failure
/// - Control probe results
/// - Simulate progress updates
#[derive(Debug, Clone)]
pub struct MockConverter {
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    conversion_duration_ms: Arc<RwLock<u64>>,
    send_progress: Arc<RwLock<bool>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            send_progress: Arc::new(RwLock::new(true)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
    }

    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Enable or disable progress events during conversion.
    pub async fn set_send_progress(&self, send: bool) {
        *self.send_progress.write().await = send;
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, conversion: &Conversion, success: bool) {
        self.conversions.write().await.push(RecordedConversion {
            arguments: conversion.build(),
            output_path: conversion.output().map(Path::to_path_buf),
            success,
        });
    }

    async fn run(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<ConversionEvent>>,
    ) -> Result<ConversionResult, ConverterError> {
        let _guard = conversion.begin_run()?;
        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }
        if let Some(err) = self.take_error().await {
            self.record(conversion, false).await;
            return Err(err);
        }

        let start_time = Utc::now();
        let duration_ms = *self.conversion_duration_ms.read().await;
        let total = conversion
            .expected_duration()
            .unwrap_or(Duration::from_secs(10));
        let steps: u32 = 5;
        let send_progress = *self.send_progress.read().await;
        let events = events.filter(|_| send_progress);

        for step in 1..=steps {
            if let Some(tx) = &events {
                let elapsed = total * step / steps;
                let progress = ConversionProgress {
                    elapsed,
                    total,
                    process_id: 0,
                };
                let line = format!("frame={} time={}", step, format_time(elapsed));
                if tx.send(ConversionEvent::Output(line)).await.is_err()
                    || tx.send(ConversionEvent::Progress(progress)).await.is_err()
                {
                    self.record(conversion, false).await;
                    return Err(ConverterError::Cancelled);
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.record(conversion, false).await;
                    return Err(ConverterError::Cancelled);
                }
                _ = tokio::time::sleep(Duration::from_millis(duration_ms / steps as u64)) => {}
            }
        }

        self.record(conversion, true).await;
        Ok(ConversionResult {
            start_time,
            end_time: Utc::now(),
            arguments: conversion.build(),
            output_path: conversion.output().map(Path::to_path_buf),
        })
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, ConverterError> {
        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(info.clone());
        }
        fixtures::media_info(path)
    }

    async fn convert(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        self.run(conversion, cancel, None).await
    }

    async fn convert_with_progress(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run(conversion, cancel, Some(events)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{AudioCodec, AudioStream};

    fn create_test_conversion(output: &str) -> Conversion {
        Conversion::new()
            .add_stream(AudioStream::new("/input/test.flac", 0).set_codec(AudioCodec::Opus))
            .set_output(output)
    }

    #[tokio::test]
    async fn test_basic_conversion() {
        let converter = MockConverter::new();
        let result = converter
            .convert(&create_test_conversion("/out/a.opus"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output_path, Some(PathBuf::from("/out/a.opus")));
        assert!(result.arguments.contains("-c:a libopus"));
    }

    #[tokio::test]
    async fn test_default_probe() {
        let converter = MockConverter::new();
        let info = converter
            .probe(Path::new("/test/video.mkv"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(info.path, PathBuf::from("/test/video.mkv"));
        assert_eq!(info.video_streams[0].width(), 1920);
        assert_eq!(info.audio_streams.len(), 2);
        assert_eq!(info.subtitle_streams.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_probe_result() {
        let converter = MockConverter::new();
        let mut custom = fixtures::media_info("/custom/file.mkv").unwrap();
        custom.size = 42;
        converter.set_probe_result("/custom/file.mkv", custom).await;

        let result = converter
            .probe(Path::new("/custom/file.mkv"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.size, 42);
    }

    #[tokio::test]
    async fn test_recorded_conversions() {
        let converter = MockConverter::new();
        let cancel = CancellationToken::new();
        converter
            .convert(&create_test_conversion("/out/1.opus"), &cancel)
            .await
            .unwrap();
        converter
            .convert(&create_test_conversion("/out/2.opus"), &cancel)
            .await
            .unwrap();

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 2);
        assert!(conversions[0].success);
        assert_eq!(conversions[1].output_path, Some(PathBuf::from("/out/2.opus")));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("boom", "-i x", Some(1)))
            .await;

        let result = converter
            .convert(&create_test_conversion("/out/a.opus"), &CancellationToken::new())
            .await;
        assert!(result.is_err());

        // Error should be consumed, conversion recorded as failed
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 1);
        assert!(!conversions[0].success);
        assert!(converter.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_progress_events() {
        let converter = MockConverter::new();
        let (tx, mut rx) = mpsc::channel(32);
        converter
            .convert_with_progress(
                &create_test_conversion("/out/a.opus"),
                &CancellationToken::new(),
                tx,
            )
            .await
            .unwrap();

        let mut percents = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ConversionEvent::Progress(progress) = event {
                percents.push(progress.percent());
            }
        }
        assert_eq!(percents, vec![20, 40, 60, 80, 100]);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let converter = MockConverter::new();
        converter
            .set_conversion_duration(Duration::from_secs(60))
            .await;
        let cancel = CancellationToken::new();
        let conversion = create_test_conversion("/out/a.opus");

        let run = converter.convert(&conversion, &cancel);
        cancel.cancel();
        let err = run.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
