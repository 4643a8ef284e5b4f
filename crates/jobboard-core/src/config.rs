// Configuration loading and parsing (config/jobboard.toml + environment overrides).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:4000/graphql";
pub const DEFAULT_WS_URL: &str = "ws://localhost:4000/graphql";

pub const ENV_GRAPHQL_URL: &str = "JOBBOARD_GRAPHQL_URL";
pub const ENV_WS_URL: &str = "JOBBOARD_WS_URL";
pub const ENV_SESSION_PATH: &str = "JOBBOARD_SESSION_PATH";

const SESSION_DB_FILE: &str = "session.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoints: Endpoints,
    /// Where the signed-in session is persisted. `None` keeps the session in
    /// memory only.
    pub session_path: Option<PathBuf>,
}

/// The two endpoint URLs of the GraphQL server: HTTP for queries and
/// mutations, WebSocket for subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            ws_url: default_ws_url(),
        }
    }
}

fn default_graphql_url() -> String {
    DEFAULT_GRAPHQL_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

// ---------------------------------------------------------------------------
// jobboard.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire jobboard.toml file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    endpoints: Endpoints,
    #[serde(default)]
    session: SessionSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionSection {
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load configuration from `config/jobboard.toml` under `base_dir`, then apply
/// overrides from `env`, then validate.
///
/// The file is optional; every field has a default. `env` is a lookup
/// function so tests can supply overrides without touching the process
/// environment.
pub fn load_config_from<F>(base_dir: &Path, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = base_dir.join("config").join("jobboard.toml");
    let file = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str::<ConfigFile>(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        ConfigFile::default()
    };

    let mut config = Config {
        endpoints: file.endpoints,
        session_path: file.session.path.or_else(default_session_path),
    };

    apply_env_overrides(&mut config, env);
    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working directory
/// with overrides from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: PathBuf::from("."),
        source: e,
    })?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_GRAPHQL_URL).filter(|v| !v.is_empty()) {
        config.endpoints.graphql_url = url;
    }
    if let Some(url) = env(ENV_WS_URL).filter(|v| !v.is_empty()) {
        config.endpoints.ws_url = url;
    }
    if let Some(path) = env(ENV_SESSION_PATH).filter(|v| !v.is_empty()) {
        config.session_path = Some(PathBuf::from(path));
    }
}

/// Platform data directory location of the session database, if the
/// platform has one.
fn default_session_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "jobboard")
        .map(|dirs| dirs.data_dir().join(SESSION_DB_FILE))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    check_url(
        "endpoints.graphql_url",
        &config.endpoints.graphql_url,
        &["http", "https"],
    )?;
    check_url("endpoints.ws_url", &config.endpoints.ws_url, &["ws", "wss"])?;
    Ok(())
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::ValidationError {
        field: field.to_string(),
        message: format!("invalid URL {value:?}: {e}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::ValidationError {
            field: field.to_string(),
            message: format!(
                "scheme must be one of {}, got {:?}",
                schemes.join("/"),
                url.scheme()
            ),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, text: &str) {
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("jobboard.toml"), text).unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config_from(tmp.path(), no_env).expect("defaults should load");

        assert_eq!(config.endpoints.graphql_url, DEFAULT_GRAPHQL_URL);
        assert_eq!(config.endpoints.ws_url, DEFAULT_WS_URL);
    }

    #[test]
    fn file_values_are_used() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
            [endpoints]
            graphql_url = "https://jobs.example.com/graphql"
            ws_url = "wss://jobs.example.com/graphql"

            [session]
            path = "custom.db"
            "#,
        );

        let config = load_config_from(tmp.path(), no_env).unwrap();
        assert_eq!(
            config.endpoints.graphql_url,
            "https://jobs.example.com/graphql"
        );
        assert_eq!(config.endpoints.ws_url, "wss://jobs.example.com/graphql");
        assert_eq!(config.session_path, Some(PathBuf::from("custom.db")));
    }

    #[test]
    fn partial_endpoints_section_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
            [endpoints]
            graphql_url = "http://api.internal:8080/graphql"
            "#,
        );

        let config = load_config_from(tmp.path(), no_env).unwrap();
        assert_eq!(config.endpoints.graphql_url, "http://api.internal:8080/graphql");
        assert_eq!(config.endpoints.ws_url, DEFAULT_WS_URL);
    }

    #[test]
    fn env_overrides_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
            [endpoints]
            graphql_url = "http://from-file/graphql"
            "#,
        );

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_GRAPHQL_URL, "http://from-env/graphql"),
            (ENV_WS_URL, "ws://from-env/graphql"),
            (ENV_SESSION_PATH, "/tmp/env-session.db"),
        ]);
        let config =
            load_config_from(tmp.path(), |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.endpoints.graphql_url, "http://from-env/graphql");
        assert_eq!(config.endpoints.ws_url, "ws://from-env/graphql");
        assert_eq!(
            config.session_path,
            Some(PathBuf::from("/tmp/env-session.db"))
        );
    }

    #[test]
    fn empty_env_value_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config_from(tmp.path(), |k| {
            (k == ENV_GRAPHQL_URL).then(String::new)
        })
        .unwrap();
        assert_eq!(config.endpoints.graphql_url, DEFAULT_GRAPHQL_URL);
    }

    #[test]
    fn rejects_ws_scheme_for_graphql_url() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_config_from(tmp.path(), |k| {
            (k == ENV_GRAPHQL_URL).then(|| "ws://localhost:4000/graphql".to_string())
        });
        match result {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "endpoints.graphql_url");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_http_scheme_for_ws_url() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
            [endpoints]
            ws_url = "http://localhost:4000/graphql"
            "#,
        );
        let err = load_config_from(tmp.path(), no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "endpoints.ws_url"
        ));
    }

    #[test]
    fn secure_endpoints_from_env_are_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_GRAPHQL_URL, "https://jobs.example.com/graphql"),
            (ENV_WS_URL, "wss://jobs.example.com/graphql"),
        ]);
        let config =
            load_config_from(tmp.path(), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.endpoints.ws_url, "wss://jobs.example.com/graphql");
    }

    #[test]
    fn rejects_unparseable_url() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config_from(tmp.path(), |k| {
            (k == ENV_WS_URL).then(|| "not a url".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("endpoints.ws_url"));
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "[endpoints\ngraphql_url = ");
        let err = load_config_from(tmp.path(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
