//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::tools::ExecutableProvider;
use super::traits::Converter;
use crate::conversion::{
    classify, render_tokens, Conversion, ConversionEvent, ConversionResult, ProgressParser,
};
use crate::metrics;
use crate::probe::{MediaInfo, Prober};
use crate::process::{ExitKind, OutputSource, ProcessRunner, RunOutput};

/// FFmpeg-based converter implementation.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    config: ConverterConfig,
    prober: Prober,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let prober = Prober::from_config(&config);
        Self { config, prober }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Creates a converter using the executables an [`ExecutableProvider`]
    /// makes available in `config.executables_dir`.
    pub async fn from_provider(
        config: ConverterConfig,
        provider: &dyn ExecutableProvider,
    ) -> Result<Self, ConverterError> {
        let tools = provider
            .ensure_available(config.executables_dir.as_deref())
            .await?;
        debug!(
            ffmpeg = %tools.ffmpeg.display(),
            ffprobe = %tools.ffprobe.display(),
            "Resolved executables"
        );
        Ok(Self::new(config.with_tool_paths(tools)))
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Full ffmpeg argument list: configured extra arguments, then the
    /// conversion's own arguments.
    fn command_line(&self, conversion: &Conversion) -> Vec<String> {
        let mut args = self.config.extra_ffmpeg_args.clone();
        args.extend(conversion.arguments_with_default(self.config.overwrite_output));
        args
    }

    async fn run_conversion(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<ConversionEvent>>,
    ) -> Result<ConversionResult, ConverterError> {
        let _guard = conversion.begin_run()?;
        let started = Instant::now();
        let result = self.execute(conversion, cancel, events).await;
        metrics::record_conversion(&result, started.elapsed());
        result
    }

    async fn execute(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<ConversionEvent>>,
    ) -> Result<ConversionResult, ConverterError> {
        let args = self.command_line(conversion);
        let rendered = render_tokens(&args);
        info!(arguments = %rendered, "Starting conversion");

        let start_time = Utc::now();
        let run_token = cancel.child_token();
        let mut parser = ProgressParser::new(conversion.expected_duration());
        let mut runner = ProcessRunner::new(&self.config.ffmpeg_path, args)
            .capture(OutputSource::Stderr)
            .with_timeout(self.config.timeout())
            .with_kill_grace(self.config.kill_grace());

        let on_line = |line: &str, process_id: u32| {
            let Some(tx) = events.as_ref() else {
                return;
            };
            parser.set_process_id(process_id);
            let mut pending = vec![ConversionEvent::Output(line.to_string())];
            if let Some(progress) = parser.parse_line(line) {
                pending.push(ConversionEvent::Progress(progress));
            }
            for event in pending {
                if let Err(TrySendError::Closed(_)) = tx.try_send(event) {
                    debug!(process_id, "Event receiver closed, cancelling conversion");
                    run_token.cancel();
                    return;
                }
            }
        };

        let RunOutput {
            text,
            exit,
            process_id,
        } = runner.run(&run_token, on_line).await?;
        drop(events);

        if exit == ExitKind::Killed {
            info!(process_id, "Conversion cancelled");
            return Err(ConverterError::Cancelled);
        }
        if let Some(classification) = classify(&text) {
            warn!(
                process_id,
                kind = %classification.kind,
                signature = classification.signature,
                "Conversion failed"
            );
            return Err(ConverterError::from_classification(
                &classification,
                text,
                rendered,
            ));
        }
        if let ExitKind::Failed { code } = exit {
            warn!(process_id, exit_code = ?code, "ffmpeg exited with an error");
            return Err(ConverterError::conversion_failed(text, rendered, code));
        }

        let result = ConversionResult {
            start_time,
            end_time: Utc::now(),
            arguments: rendered,
            output_path: conversion.output().map(Path::to_path_buf),
        };
        info!(
            process_id,
            duration_ms = result.duration().as_millis() as u64,
            "Conversion finished"
        );
        Ok(result)
    }

    async fn check_executable(&self, program: &Path) -> Result<(), ConverterError> {
        let mut runner = ProcessRunner::new(program, vec!["-version".to_string()])
            .capture(OutputSource::Stdout)
            .with_timeout(self.config.timeout())
            .with_kill_grace(self.config.kill_grace());
        let output = runner.run(&CancellationToken::new(), |_, _| {}).await?;
        match output.exit {
            ExitKind::Correct => {
                let version = output.text.lines().next().unwrap_or_default();
                debug!(program = %program.display(), version, "Executable available");
                Ok(())
            }
            ExitKind::Failed { code } => Err(ConverterError::conversion_failed(
                output.text,
                "-version",
                code,
            )),
            ExitKind::Killed => Err(ConverterError::Cancelled),
        }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, ConverterError> {
        self.prober.probe(path, cancel).await
    }

    async fn convert(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(conversion, cancel, None).await
    }

    async fn convert_with_progress(
        &self,
        conversion: &Conversion,
        cancel: &CancellationToken,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(conversion, cancel, Some(events)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        self.check_executable(&self.config.ffmpeg_path).await?;
        self.check_executable(&self.config.ffprobe_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{LocalExecutables, ToolPaths};
    use crate::streams::{VideoCodec, VideoStream};

    fn missing_tools() -> ConverterConfig {
        ConverterConfig::with_paths(
            "/definitely/not/ffmpeg".into(),
            "/definitely/not/ffprobe".into(),
        )
    }

    fn simple_conversion() -> Conversion {
        Conversion::new()
            .add_stream(VideoStream::new("/in/a.mkv", 0).set_codec(VideoCodec::H264))
            .set_output("/out/a.mp4")
    }

    #[test]
    fn test_name() {
        assert_eq!(FfmpegConverter::with_defaults().name(), "ffmpeg");
    }

    #[test]
    fn test_command_line_prepends_extra_args() {
        let converter = FfmpegConverter::new(
            ConverterConfig::default().with_extra_args(["-hide_banner", "-nostdin"]),
        );
        let args = converter.command_line(&simple_conversion());
        assert_eq!(&args[..3], &["-hide_banner", "-nostdin", "-n"]);
        assert_eq!(args.last().map(String::as_str), Some("/out/a.mp4"));
    }

    #[test]
    fn test_command_line_uses_configured_overwrite() {
        let converter =
            FfmpegConverter::new(ConverterConfig::default().with_overwrite_output(true));
        assert_eq!(converter.command_line(&simple_conversion())[0], "-y");

        let explicit = simple_conversion().set_overwrite_output(false);
        assert_eq!(converter.command_line(&explicit)[0], "-n");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg() {
        let converter = FfmpegConverter::new(missing_tools());
        let err = converter
            .convert(&simple_conversion(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ExecutableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let converter = FfmpegConverter::new(missing_tools());
        let token = CancellationToken::new();
        token.cancel();
        let err = converter
            .convert(&simple_conversion(), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_conversion_already_running() {
        let converter = FfmpegConverter::new(missing_tools());
        let conversion = simple_conversion();
        let _guard = conversion.begin_run().unwrap();

        let err = converter
            .convert(&conversion, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::MultipleConversionInProgress));

        // A clone has its own guard.
        let err = converter
            .convert(&conversion.clone(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ExecutableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_validate_missing_tools() {
        let converter = FfmpegConverter::new(missing_tools());
        let err = converter.validate().await.unwrap_err();
        assert!(matches!(err, ConverterError::ExecutableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_from_provider_uses_resolved_paths() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ffmpeg", "ffprobe"] {
            std::fs::write(
                dir.path().join(format!("{}{}", name, std::env::consts::EXE_SUFFIX)),
                "",
            )
            .unwrap();
        }
        let config = ConverterConfig::default().with_executables_dir(dir.path().to_path_buf());

        let converter = FfmpegConverter::from_provider(config, &LocalExecutables)
            .await
            .unwrap();
        let expected = ToolPaths {
            ffmpeg: dir
                .path()
                .join(format!("ffmpeg{}", std::env::consts::EXE_SUFFIX)),
            ffprobe: dir
                .path()
                .join(format!("ffprobe{}", std::env::consts::EXE_SUFFIX)),
        };
        assert_eq!(converter.config().ffmpeg_path, expected.ffmpeg);
        assert_eq!(converter.config().ffprobe_path, expected.ffprobe);
    }
}
