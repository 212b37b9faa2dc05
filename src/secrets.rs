//! Credential lookup.
//!
//! The handler only sees the [`SecretResolver`] trait. Two backends exist:
//!
//! - [`ExtensionSecretResolver`] asks the AWS Parameters and Secrets
//!   extension running next to the function on `localhost`.
//! - [`FileSecretResolver`] reads a mounted secrets directory, one file per
//!   secret (Docker/Kubernetes style).

use std::path::PathBuf;

use async_trait::async_trait;
use axum::http::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RelayError, Result};

pub const DEFAULT_EXTENSION_PORT: u16 = 2773;
const EXTENSION_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Fetches the value of the named secret.
    async fn get_secret_value(&self, name: &str) -> Result<SecretString>;
}

/// Resolves secrets through the extension's local HTTP endpoint.
pub struct ExtensionSecretResolver {
    client: reqwest::Client,
    endpoint: String,
    session_token: SecretString,
}

#[derive(Deserialize)]
struct ExtensionSecretResponse {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>,
}

impl ExtensionSecretResolver {
    pub fn new(port: u16, session_token: SecretString) -> Self {
        Self::with_endpoint(format!("http://localhost:{port}"), session_token)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, session_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            session_token,
        }
    }
}

#[async_trait]
impl SecretResolver for ExtensionSecretResolver {
    async fn get_secret_value(&self, name: &str) -> Result<SecretString> {
        use secrecy::ExposeSecret;

        debug!("Retrieving token from secret: {}", name);
        let response = self
            .client
            .get(format!("{}/secretsmanager/get", self.endpoint))
            .query(&[("secretId", name)])
            .header(EXTENSION_TOKEN_HEADER, self.session_token.expose_secret())
            .send()
            .await
            .map_err(|e| RelayError::secret(name, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RelayError::secret(
                name,
                format!("secrets extension returned {}", status),
            ));
        }

        let payload: ExtensionSecretResponse = response
            .json()
            .await
            .map_err(|e| RelayError::secret(name, e))?;

        match payload.secret_string {
            Some(value) => {
                debug!("Retrieved token");
                Ok(SecretString::from(value))
            }
            None => Err(RelayError::secret(name, "secret has no string value")),
        }
    }
}

/// Resolves secrets from files named after the secret inside a directory.
pub struct FileSecretResolver {
    directory: PathBuf,
}

impl FileSecretResolver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn secret_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(RelayError::secret(name, "invalid secret name"));
        }
        Ok(self.directory.join(name))
    }
}

#[async_trait]
impl SecretResolver for FileSecretResolver {
    async fn get_secret_value(&self, name: &str) -> Result<SecretString> {
        let path = self.secret_path(name)?;
        debug!("Retrieving token from secret file: {:?}", path);

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RelayError::secret(name, e))?;

        let value = contents.trim();
        if value.is_empty() {
            return Err(RelayError::secret(name, "secret file is empty"));
        }

        debug!("Retrieved token");
        Ok(SecretString::from(value.to_string()))
    }
}
