use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[converter]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
timeout_secs = 600
extra_ffmpeg_args = ["-hide_banner"]

[logging]
level = "debug"
json = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.converter.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.converter.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.converter.timeout_secs, Some(600));
        assert_eq!(config.converter.extra_ffmpeg_args, vec!["-hide_banner"]);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_deserialize_unknown_type_fails() {
        let toml = r#"
[converter]
timeout_secs = "soon"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
