//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::tools::ToolPaths;

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Directory searched for ffmpeg/ffprobe before `PATH`.
    #[serde(default)]
    pub executables_dir: Option<PathBuf>,

    /// Timeout for a single run in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// How long a cancelled run may take to quit before it is killed.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Overwrite policy for conversions that do not set one.
    #[serde(default)]
    pub overwrite_output: bool,

    /// Arguments placed before every conversion's own arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Capacity of the progress event channel used by the CLI.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_kill_grace_ms() -> u64 {
    5000
}

fn default_event_buffer() -> usize {
    64
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            executables_dir: None,
            timeout_secs: None,
            kill_grace_ms: default_kill_grace_ms(),
            overwrite_output: false,
            extra_ffmpeg_args: Vec::new(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Uses the executables located by an [`ExecutableProvider`](super::ExecutableProvider).
    pub fn with_tool_paths(mut self, tools: ToolPaths) -> Self {
        self.ffmpeg_path = tools.ffmpeg;
        self.ffprobe_path = tools.ffprobe;
        self
    }

    pub fn with_executables_dir(mut self, dir: PathBuf) -> Self {
        self.executables_dir = Some(dir);
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_overwrite_output(mut self, overwrite: bool) -> Self {
        self.overwrite_output = overwrite;
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_ffmpeg_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.timeout(), None);
        assert_eq!(config.kill_grace(), Duration::from_secs(5));
        assert_eq!(config.event_buffer, 64);
        assert!(!config.overwrite_output);
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_timeout(7200)
        .with_kill_grace(Duration::from_millis(250))
        .with_extra_args(["-hide_banner"]);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(7200)));
        assert_eq!(config.kill_grace_ms, 250);
        assert_eq!(config.extra_ffmpeg_args, vec!["-hide_banner"]);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default().with_timeout(30);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let sparse: ConverterConfig = serde_json::from_str(r#"{"overwrite_output":true}"#).unwrap();
        assert!(sparse.overwrite_output);
        assert_eq!(sparse.kill_grace_ms, 5000);
    }
}
