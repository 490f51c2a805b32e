use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one library root
/// - Refresh interval is not 0
/// - Converted prefix is not empty
/// - Stream chunk size is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.library.roots.is_empty() {
        return Err(ConfigError::ValidationError(
            "library.roots must name at least one directory".to_string(),
        ));
    }

    if config.library.refresh_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "library.refresh_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.library.converted_prefix.is_empty() {
        return Err(ConfigError::ValidationError(
            "library.converted_prefix cannot be empty".to_string(),
        ));
    }

    if config.stream.chunk_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "stream.chunk_size_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use std::path::PathBuf;

    fn valid() -> Config {
        Config {
            library: LibraryConfig::default().with_roots(vec![PathBuf::from("/srv/movies")]),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_no_roots_fails() {
        let result = validate_config(&Config::default());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = valid();
        config.library.refresh_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_prefix_fails() {
        let mut config = valid();
        config.library.converted_prefix.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_chunk_fails() {
        let mut config = valid();
        config.stream.chunk_size_bytes = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunk_size_bytes"));
    }
}
