mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ffconduit_core::{
    conversion::{Conversion, ConversionEvent},
    load_config_or_default, metrics, validate_config, AudioCodec, Config, Converter,
    EncoderCapabilities, FfmpegConverter, LocalExecutables, LoggingConfig, MediaInfo,
    VideoCodec,
};

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config from environment".to_string(),
    })?;
    validate_config(&config).context("Configuration validation failed")?;
    init_logging(&config.logging);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let outcome = execute(cli.command, &config, &cancel).await;
    if cli.print_metrics {
        print!("{}", encode_metrics()?);
    }
    outcome
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);
    // stdout carries command results; logs go to stderr.
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn execute(command: Command, config: &Config, cancel: &CancellationToken) -> Result<()> {
    match command {
        Command::Probe { path } => {
            let info = converter(config).await?.probe(&path, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Convert {
            input,
            output,
            video_codec,
            audio_codec,
            preset,
            size,
            overwrite,
        } => {
            let converter = converter(config).await?;
            let info = converter
                .probe(&input, cancel)
                .await
                .with_context(|| format!("Failed to probe {:?}", input))?;

            let mut conversion =
                build_conversion(&info, video_codec, audio_codec, size).set_output(&output);
            if overwrite {
                conversion = conversion.set_overwrite_output(true);
            }
            if let Some(preset) = preset {
                conversion = conversion.set_preset(preset);
            }

            let (tx, rx) = mpsc::channel(config.converter.event_buffer);
            let reporter = tokio::spawn(report_progress(rx));
            let result = converter
                .convert_with_progress(&conversion, cancel, tx)
                .await;
            await_reporter(reporter).await;
            let result = result.with_context(|| format!("Failed to convert {:?}", input))?;
            info!(
                output = %output.display(),
                duration_ms = result.duration().as_millis() as u64,
                "Conversion complete"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Capabilities => {
            let caps = EncoderCapabilities::detect(&config.converter).await;
            println!("{}", serde_json::to_string_pretty(&caps)?);
        }
        Command::Validate => {
            let converter = converter(config).await?;
            converter.validate().await.context("ffmpeg is not usable")?;
            println!(
                "ffmpeg: {}\nffprobe: {}",
                converter.config().ffmpeg_path.display(),
                converter.config().ffprobe_path.display()
            );
        }
    }
    Ok(())
}

async fn converter(config: &Config) -> Result<FfmpegConverter> {
    let converter = match &config.converter.executables_dir {
        Some(dir) => FfmpegConverter::from_provider(config.converter.clone(), &LocalExecutables)
            .await
            .with_context(|| format!("No ffmpeg/ffprobe in {:?} or on PATH", dir))?,
        None => FfmpegConverter::new(config.converter.clone()),
    };
    Ok(converter)
}

/// Maps every probed stream into the output, applying the requested codecs.
fn build_conversion(
    info: &MediaInfo,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    size: Option<(u32, u32)>,
) -> Conversion {
    let videos = info.video_streams.iter().cloned().map(|mut stream| {
        if let Some(name) = &video_codec {
            stream = stream.set_codec(video_codec_named(name));
        }
        if let Some((width, height)) = size {
            stream = stream.set_size(width, height);
        }
        stream
    });
    let audios = info.audio_streams.iter().cloned().map(|stream| match &audio_codec {
        Some(name) => stream.set_codec(audio_codec_named(name)),
        None => stream,
    });

    Conversion::new()
        .add_streams(videos)
        .add_streams(audios)
        .add_streams(info.subtitle_streams.iter().cloned())
}

fn video_codec_named(name: &str) -> VideoCodec {
    match name {
        "copy" => VideoCodec::Copy,
        other => VideoCodec::Custom(other.to_string()),
    }
}

fn audio_codec_named(name: &str) -> AudioCodec {
    match name {
        "copy" => AudioCodec::Copy,
        other => AudioCodec::Custom(other.to_string()),
    }
}

async fn report_progress(mut rx: mpsc::Receiver<ConversionEvent>) {
    let mut last_percent = None;
    while let Some(event) = rx.recv().await {
        match event {
            ConversionEvent::Progress(progress) => {
                let percent = progress.percent();
                if last_percent != Some(percent) {
                    info!(
                        percent,
                        elapsed_secs = progress.elapsed.as_secs_f64(),
                        total_secs = progress.total.as_secs_f64(),
                        "Progress"
                    );
                    last_percent = Some(percent);
                }
            }
            ConversionEvent::Output(line) => tracing::trace!(target: "ffmpeg", "{}", line),
        }
    }
}

/// Waits for the progress reporter; a failed reporter never fails the run.
async fn await_reporter(reporter: JoinHandle<()>) -> bool {
    match reporter.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Progress reporter stopped abnormally");
            false
        }
    }
}

/// Cancel on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Signal received, cancelling");
    cancel.cancel();
}

fn encode_metrics() -> Result<String> {
    let registry = metrics::registry().context("Failed to register metrics")?;
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffconduit_core::testing::fixtures;
    use std::path::Path;

    #[test]
    fn test_build_conversion_maps_all_streams() {
        let info = fixtures::media_info("/media/in.mkv").unwrap();
        let conversion = build_conversion(&info, Some("copy".into()), Some("libopus".into()), None)
            .set_output(Path::new("/media/out.mkv"));
        let args = conversion.arguments();

        assert_eq!(conversion.streams().len(), 4);
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "libopus"]));
        assert_eq!(args.last().map(String::as_str), Some("/media/out.mkv"));
    }

    #[test]
    fn test_build_conversion_scales_video() {
        let info = fixtures::media_info("/media/in.mkv").unwrap();
        let args = build_conversion(&info, None, None, Some((1280, 720))).arguments();
        assert!(args.iter().any(|a| a.contains("scale=1280:720")));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(video_codec_named("copy"), VideoCodec::Copy);
        assert_eq!(
            audio_codec_named("libfdk_aac"),
            AudioCodec::Custom("libfdk_aac".to_string())
        );
    }

    #[tokio::test]
    async fn test_reporter_failure_is_logged_not_fatal() {
        assert!(await_reporter(tokio::spawn(async {})).await);

        let failing = tokio::spawn(async { panic!("reporter crashed") });
        assert!(!await_reporter(failing).await);
    }

    #[test]
    fn test_encode_metrics() {
        let text = encode_metrics().unwrap();
        assert!(text.is_empty() || text.contains("ffconduit_"));
    }
}
