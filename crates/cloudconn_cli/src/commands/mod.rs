//! CLI command implementations.

pub mod objects;
pub mod records;

use cloudconn_core::{Connector, ConnectorError, ProviderId};
use cloudconn_providers::{BackendFactory, ConfigError, ConnectorConfig, LocalConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Root of the local provider when no configuration file is given.
pub const DEFAULT_LOCAL_ROOT: &str = ".cloudconn";

/// Errors reported by the CLI, printed as `kind: message`.
#[derive(Debug, Error)]
pub enum CliError {
    /// A facade operation failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// The configuration could not be loaded or applied.
    #[error("invalid_input: {0}")]
    Config(#[from] ConfigError),

    /// Command arguments are malformed.
    #[error("invalid_input: {0}")]
    Usage(String),

    /// Writing output failed.
    #[error("unknown: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Loads the configuration and connects to the selected provider.
///
/// Without a configuration file the local provider rooted at
/// [`DEFAULT_LOCAL_ROOT`] is used. Environment overrides apply on top of
/// the file and `provider` on top of both.
pub fn connect(config_path: Option<&Path>, provider: Option<ProviderId>) -> CliResult<Connector> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ConnectorConfig::from_file(path)?
        }
        None => ConnectorConfig::local(PathBuf::from(DEFAULT_LOCAL_ROOT)),
    };
    config.apply_env_overrides()?;
    if let Some(provider) = provider {
        config.provider = provider;
    }
    if config.provider == ProviderId::Local && config.local.is_none() {
        config.local = Some(LocalConfig::new(DEFAULT_LOCAL_ROOT));
    }

    let connector = BackendFactory::new().connect(&config)?;
    info!("Connected to {}", connector.provider());
    Ok(connector)
}

/// Parses a `FIELD=VALUE` condition; `VALUE` is JSON when it parses as
/// JSON and a plain string otherwise.
pub fn parse_condition(s: &str) -> Result<(String, Value), String> {
    let (field, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    if field.is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudconn_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn conditions_parse_json_values() {
        assert_eq!(parse_condition("age=30").unwrap(), ("age".into(), json!(30)));
        assert_eq!(parse_condition("ok=true").unwrap(), ("ok".into(), json!(true)));
        assert_eq!(parse_condition("name=\"Ada\"").unwrap(), ("name".into(), json!("Ada")));
        assert_eq!(parse_condition("team=red").unwrap(), ("team".into(), json!("red")));
        assert_eq!(parse_condition("expr=a=b").unwrap(), ("expr".into(), json!("a=b")));
        assert_eq!(parse_condition("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn malformed_conditions_are_rejected() {
        assert!(parse_condition("novalue").is_err());
        assert!(parse_condition("=3").is_err());
    }

    #[test]
    fn errors_print_as_kind_and_message() {
        let err = CliError::from(ConnectorError::not_found("no such object"));
        assert_eq!(err.to_string(), "not_found: no such object");

        let err = CliError::Usage("record must be a JSON object".into());
        assert!(err.to_string().starts_with("invalid_input: "));
        assert_eq!(ErrorKind::InvalidInput.as_str(), "invalid_input");
    }

    #[test]
    fn config_file_selects_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({"provider": "local", "local": {"root": root}})).unwrap(),
        )
        .unwrap();

        let connector = connect(Some(path.as_path()), None).unwrap();
        connector.storage().put("k", b"v").unwrap();
        assert!(root.join("objects").join("6b.obj").exists());
    }

    #[test]
    fn cloud_provider_without_client_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"provider": "gcp", "gcp": {"project_id": "p", "bucket": "b"}}"#,
        )
        .unwrap();

        let err = connect(Some(path.as_path()), None).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::NoClient(ProviderId::Gcp))));
    }
}
