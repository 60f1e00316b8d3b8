use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - converter.timeout_secs is not 0 when set
/// - converter.event_buffer is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.converter.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0; omit it to disable the timeout".to_string(),
        ));
    }

    // A zero-capacity mpsc channel panics on creation.
    if config.converter.event_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "converter.event_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let config = Config {
            converter: ConverterConfig::default().with_timeout(0),
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_event_buffer_zero_fails() {
        let mut config = Config::default();
        config.converter.event_buffer = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
