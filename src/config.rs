//! Process configuration, built once at cold start.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{RelayError, Result};
use crate::github::DEFAULT_API_URL;
use crate::logging::{LogConfig, LogFormat};
use crate::secrets::DEFAULT_EXTENSION_PORT;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";
pub const CONFIG_PATH_ENV: &str = "STATUS_RELAY_CONFIG";

/// Where the bearer credential comes from.
#[derive(Debug)]
pub enum SecretBackend {
    /// The Parameters and Secrets extension on `localhost:{port}`.
    Extension { port: u16, session_token: SecretString },
    /// One file per secret inside `dir`.
    File { dir: PathBuf },
}

/// Values read from the optional TOML file. Everything may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub function_name: Option<String>,
    pub credential_name: Option<String>,
    pub secret_backend: Option<String>,
    pub extension_port: Option<u16>,
    pub secrets_dir: Option<PathBuf>,
    pub github_api_url: Option<String>,
    pub bind_address: Option<String>,
    pub log_format: Option<String>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RelayConfig {
    pub function_name: String,
    pub credential_name: String,
    pub secret_backend: SecretBackend,
    pub github_api_url: String,
    pub bind_address: String,
    pub log: LogConfig,
}

/// Handlers this binary knows how to run, chosen by function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    GithubPostStatus,
}

impl HandlerKind {
    pub fn from_function_name(name: &str) -> Option<Self> {
        if name.contains("GithubPostStatus") {
            Some(HandlerKind::GithubPostStatus)
        } else {
            None
        }
    }
}

/// Load and parse the configuration file
pub fn load_file_config(path: &str) -> Result<FileConfig> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: FileConfig = toml::from_str(&config_str).map_err(|e| {
        RelayError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    Ok(config)
}

impl RelayConfig {
    /// Reads the optional config file named by `STATUS_RELAY_CONFIG`, then
    /// applies the process environment on top.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => load_file_config(&path)?,
            _ => FileConfig::default(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Environment values win over file values, which win over defaults.
    /// Empty environment values count as unset.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let function_name = env("AWS_LAMBDA_FUNCTION_NAME")
            .or(file.function_name)
            .ok_or_else(|| RelayError::ConfigError("No function name configured".to_string()))?;

        let credential_name = env("GIT_STATUS_CREDENTIAL_NAME")
            .or(file.credential_name)
            .ok_or_else(|| RelayError::ConfigError("No credential name configured".to_string()))?;

        let backend = env("SECRET_BACKEND")
            .or(file.secret_backend)
            .unwrap_or_else(|| "extension".to_string());
        let secret_backend = match backend.to_lowercase().as_str() {
            "extension" => {
                let port = match env("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|e| {
                        RelayError::ConfigError(format!("Invalid extension port '{}': {}", raw, e))
                    })?,
                    None => file.extension_port.unwrap_or(DEFAULT_EXTENSION_PORT),
                };
                SecretBackend::Extension {
                    port,
                    session_token: SecretString::from(
                        env("AWS_SESSION_TOKEN").unwrap_or_default(),
                    ),
                }
            }
            "file" => SecretBackend::File {
                dir: env("SECRETS_DIR")
                    .map(PathBuf::from)
                    .or(file.secrets_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR)),
            },
            other => {
                return Err(RelayError::ConfigError(format!(
                    "Unknown secret backend '{}'. Expected 'extension' or 'file'",
                    other
                )));
            }
        };

        let format = env("LOG_FORMAT")
            .or(file.log_format)
            .unwrap_or_else(|| "json".to_string());
        let format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(RelayError::ConfigError(format!(
                    "Unknown log format '{}'. Expected 'json' or 'text'",
                    other
                )));
            }
        };

        Ok(Self {
            log: LogConfig {
                function_name: function_name.clone(),
                format,
                directory: env("LOG_DIR").map(PathBuf::from).or(file.log_dir),
            },
            function_name,
            credential_name,
            secret_backend,
            github_api_url: env("GITHUB_API_URL")
                .or(file.github_api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bind_address: env("BIND_ADDRESS")
                .or(file.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        })
    }

    pub fn handler_kind(&self) -> Result<HandlerKind> {
        HandlerKind::from_function_name(&self.function_name).ok_or_else(|| {
            RelayError::ConfigError(format!(
                "No handler registered for function '{}'",
                self.function_name
            ))
        })
    }
}
