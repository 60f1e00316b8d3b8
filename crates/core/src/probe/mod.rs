//! Media inspection with ffprobe.
//!
//! Probing runs two ffprobe queries concurrently, one for the streams and
//! one for container facts, and reconciles them into a [`MediaInfo`]:
//!
//! - stream durations and bitrates at or below 0.01 fall back to the
//!   container value;
//! - framerate is counted frames over duration when available, otherwise
//!   the nominal `r_frame_rate`;
//! - the aspect ratio is the reduced `width:height`, `0:0` when unknown.

mod model;
mod parse;

pub use parse::parse_probe_output;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::converter::{ConverterConfig, ConverterError};
use crate::metrics;
use crate::process::{ExitKind, OutputSource, ProcessRunner, RunOutput};
use crate::streams::{AudioStream, MediaStream, SubtitleStream, VideoStream};

/// Description of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// Size in bytes as reported by the container.
    pub size: u64,
    pub creation_time: Option<DateTime<Utc>>,
    /// Longest video or audio stream.
    pub duration: Duration,
    /// Container format list, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub format_name: Option<String>,
    /// Container bitrate in bits per second.
    pub bit_rate: Option<u64>,
    pub video_streams: Vec<VideoStream>,
    pub audio_streams: Vec<AudioStream>,
    pub subtitle_streams: Vec<SubtitleStream>,
}

impl MediaInfo {
    /// All streams: video, then audio, then subtitles.
    pub fn streams(&self) -> impl Iterator<Item = MediaStream> + '_ {
        self.video_streams
            .iter()
            .cloned()
            .map(MediaStream::from)
            .chain(self.audio_streams.iter().cloned().map(MediaStream::from))
            .chain(self.subtitle_streams.iter().cloned().map(MediaStream::from))
    }
}

/// Runs ffprobe.
#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe: PathBuf,
    timeout: Option<Duration>,
    kill_grace: Duration,
}

impl Prober {
    pub fn new(ffprobe: impl AsRef<Path>) -> Self {
        Self {
            ffprobe: ffprobe.as_ref().to_path_buf(),
            timeout: None,
            kill_grace: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            ffprobe: config.ffprobe_path.clone(),
            timeout: config.timeout(),
            kill_grace: config.kill_grace(),
        }
    }

    /// Probes a local file or a URL.
    ///
    /// Local paths are checked before anything is spawned; anything with a
    /// `scheme://` prefix is handed to ffprobe as is.
    pub async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, ConverterError> {
        let start = Instant::now();
        let result = self.probe_inner(path, cancel).await;
        metrics::record_probe(&result, start.elapsed());
        result
    }

    async fn probe_inner(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, ConverterError> {
        if !is_url(path) && !path.exists() {
            return Err(ConverterError::invalid_input(path, "file does not exist"));
        }

        let target = path.to_string_lossy().into_owned();
        let streams_args = query_args(&["-show_streams"], &target);
        let format_args = query_args(
            &[
                "-show_entries",
                "format=size,duration,bit_rate,format_name:format_tags=creation_time",
            ],
            &target,
        );
        debug!(path = %path.display(), "Probing media");

        let (streams, format) = tokio::join!(
            self.run_query(streams_args, cancel),
            self.run_query(format_args, cancel)
        );
        let ((streams, streams_exit), (format, format_exit)) = (streams?, format?);

        // ffprobe exits non-zero for files it cannot demux but still prints
        // JSON; the parsed streams decide unless the output is unreadable.
        let failed = [streams_exit, format_exit]
            .into_iter()
            .find_map(|exit| match exit {
                ExitKind::Failed { code } => Some(code),
                _ => None,
            });
        if let Some(code) = failed {
            debug!(path = %path.display(), exit_code = ?code, "ffprobe exited with an error");
        }
        let info = parse_probe_output(path, &streams, &format).map_err(|err| match (err, failed) {
            (ConverterError::ParseError { reason }, Some(code)) => ConverterError::probe_failed(
                format!("ffprobe exited with code {:?}: {}", code, reason),
            ),
            (err, _) => err,
        })?;

        info!(
            path = %path.display(),
            video = info.video_streams.len(),
            audio = info.audio_streams.len(),
            subtitles = info.subtitle_streams.len(),
            duration_secs = info.duration.as_secs_f64(),
            "Probed media"
        );
        Ok(info)
    }

    async fn run_query(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<(String, ExitKind), ConverterError> {
        let mut runner = ProcessRunner::new(&self.ffprobe, args)
            .capture(OutputSource::Stdout)
            .with_timeout(self.timeout)
            .with_kill_grace(self.kill_grace);
        let RunOutput { text, exit, .. } = runner.run(cancel, |_, _| {}).await?;
        match exit {
            ExitKind::Killed => Err(ConverterError::Cancelled),
            exit => Ok((text, exit)),
        }
    }
}

fn query_args(query: &[&str], target: &str) -> Vec<String> {
    let mut args: Vec<String> = ["-v", "panic", "-print_format", "json=c=1"]
        .iter()
        .chain(query)
        .map(|s| s.to_string())
        .collect();
    args.push(target.to_string());
    args
}

fn is_url(path: &Path) -> bool {
    path.to_str().is_some_and(|s| s.contains("://"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_args() {
        let args = query_args(&["-show_streams"], "/a b.mkv");
        assert_eq!(
            args,
            vec!["-v", "panic", "-print_format", "json=c=1", "-show_streams", "/a b.mkv"]
        );
    }

    #[test]
    fn test_is_url() {
        assert!(is_url(Path::new("rtsp://camera.local/stream")));
        assert!(!is_url(Path::new("/media/movie.mkv")));
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_input() {
        let prober = Prober::new("/definitely/not/ffprobe");
        let err = prober
            .probe(Path::new("/definitely/not/here.mkv"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::InvalidInput { .. }));
    }
}
