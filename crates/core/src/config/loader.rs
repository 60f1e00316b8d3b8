use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables overriding file values, e.g.
/// `FFCONDUIT_CONVERTER__TIMEOUT_SECS=600`.
pub const ENV_PREFIX: &str = "FFCONDUIT_";

fn env() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(env())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from an optional file; defaults plus environment
/// overrides when no path is given.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Figment::from(Serialized::defaults(Config::default()))
            .merge(env())
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string())),
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[converter]
kill_grace_ms = 250
overwrite_output = true
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.converter.kill_grace_ms, 250);
        assert!(config.converter.overwrite_output);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("[converter\nffmpeg_path = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/ffconduit.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[converter]
ffprobe_path = "/usr/local/bin/ffprobe"
event_buffer = 16

[logging]
json = true
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.converter.ffprobe_path.to_str(),
            Some("/usr/local/bin/ffprobe")
        );
        assert_eq!(config.converter.event_buffer, 16);
        assert_eq!(config.converter.ffmpeg_path.to_str(), Some("ffmpeg"));
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "ffconduit.toml",
                r#"
[converter]
timeout_secs = 30
"#,
            )?;
            jail.set_env("FFCONDUIT_CONVERTER__TIMEOUT_SECS", "90");
            jail.set_env("FFCONDUIT_LOGGING__LEVEL", "trace");

            let config = load_config(Path::new("ffconduit.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.converter.timeout_secs, Some(90));
            assert_eq!(config.logging.level, "trace");

            let defaults = load_config_or_default(None)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(defaults.converter.timeout_secs, Some(90));
            Ok(())
        });
    }
}
