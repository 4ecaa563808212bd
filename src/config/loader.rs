//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::debug!(
        path = %path.display(),
        peers = config.peers.len(),
        channels = config.channels.len(),
        "Gateway configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Path::new("does-not-exist.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = parse_config("query = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_display() {
        let err = parse_config("[query]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: query.timeout_secs"));
    }

    #[test]
    fn test_every_validation_error_is_listed() {
        let err = parse_config("[query]\ntimeout_secs = 0\nstrategy = \"RANDOM\"\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: query.timeout_secs: must be greater than 0, \
             query.strategy: unknown query strategy 'RANDOM'"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = load_config(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(err.to_string().starts_with("IO error: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("gateway-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[client]\nmsp_id = \"Org2MSP\"\n\n[transaction]\ncommit_timeout_secs = 60\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.client.msp_id, "Org2MSP");
        assert_eq!(config.options.transaction.commit_timeout_secs, 60);

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
