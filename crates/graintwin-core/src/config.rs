//! Loading a [`TwinConfig`] from JSON

use std::path::Path;

use graintwin_logic::config::{validate_config, ConfigError, TwinConfig};

/// Errors from reading a config file
#[derive(Debug)]
pub enum ConfigLoadError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(Vec<ConfigError>),
}

impl From<std::io::Error> for ConfigLoadError {
    fn from(e: std::io::Error) -> Self {
        ConfigLoadError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigLoadError {
    fn from(e: serde_json::Error) -> Self {
        ConfigLoadError::Parse(e)
    }
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::Io(e) => write!(f, "IO error: {}", e),
            ConfigLoadError::Parse(e) => write!(f, "Config parse error: {}", e),
            ConfigLoadError::Invalid(errors) => {
                let list = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Invalid config: {}", list)
            }
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Parse and validate a JSON config. Missing fields take their defaults.
pub fn parse_config(json: &str) -> Result<TwinConfig, ConfigLoadError> {
    let config: TwinConfig = serde_json::from_str(json)?;
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigLoadError::Invalid(errors))
    }
}

/// Read, parse and validate a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<TwinConfig, ConfigLoadError> {
    let json = std::fs::read_to_string(path)?;
    parse_config(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(parse_config("{}").unwrap(), TwinConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config(r#"{"seed": 7, "silo": {"particle_count": 100}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.silo.particle_count, 100);
        assert_eq!(config.silo.radius, 1.9);
        assert_eq!(config.history_capacity, 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config(r#"{"tick_seconds": 0.0}"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(ref e) if e.len() == 1));
    }

    #[test]
    fn test_bad_json_rejected() {
        assert!(matches!(
            parse_config("{not json"),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/graintwin.json"),
            Err(ConfigLoadError::Io(_))
        ));
    }
}
