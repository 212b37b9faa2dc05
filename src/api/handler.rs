//! Commit status handler: validate, fetch the token, post, respond.
//!
//! Validation failures are soft: they produce a 400 and nothing else.
//! Failures after validation are hard: the 400 goes back *and* the error is
//! handed to the caller so the platform can alert on it.

use axum::http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};

use super::event::{API_VERSION_RESPONSE_HEADER, ProxyRequest, ProxyResponse};
use crate::config::{RelayConfig, SecretBackend};
use crate::error::{RelayError, Result};
use crate::github::StatusPoster;
use crate::secrets::{ExtensionSecretResolver, FileSecretResolver, SecretResolver};
use crate::validate::{validate_body, validate_headers};

/// Result of one invocation.
#[derive(Debug)]
pub struct Outcome {
    pub response: ProxyResponse,
    /// Set only for hard failures.
    pub failure: Option<RelayError>,
}

impl Outcome {
    fn respond(response: ProxyResponse) -> Self {
        Self {
            response,
            failure: None,
        }
    }

    fn fail(response: ProxyResponse, failure: RelayError) -> Self {
        Self {
            response,
            failure: Some(failure),
        }
    }

    pub fn into_result(self) -> (ProxyResponse, Result<()>) {
        let result = match self.failure {
            Some(e) => Err(e),
            None => Ok(()),
        };
        (self.response, result)
    }
}

pub struct StatusHandler {
    credential_name: String,
    secrets: Box<dyn SecretResolver>,
    poster: StatusPoster,
}

impl StatusHandler {
    pub fn new(
        credential_name: impl Into<String>,
        secrets: Box<dyn SecretResolver>,
        poster: StatusPoster,
    ) -> Self {
        Self {
            credential_name: credential_name.into(),
            secrets,
            poster,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let secrets: Box<dyn SecretResolver> = match &config.secret_backend {
            SecretBackend::Extension {
                port,
                session_token,
            } => Box::new(ExtensionSecretResolver::new(
                *port,
                SecretString::from(session_token.expose_secret().to_string()),
            )),
            SecretBackend::File { dir } => Box::new(FileSecretResolver::new(dir.clone())),
        };
        let poster = StatusPoster::new(&config.github_api_url)?;

        Ok(Self::new(config.credential_name.clone(), secrets, poster))
    }

    pub async fn handle_event(&self, event: &ProxyRequest) -> Outcome {
        let mut response = ProxyResponse::scaffold(&event.request_id);

        let api_version = match validate_headers(&event.headers) {
            Ok(version) => version,
            Err(e) => {
                error!("Invalid headers: {}", e);
                return Outcome::respond(response);
            }
        };
        response.headers.insert(
            API_VERSION_RESPONSE_HEADER.to_string(),
            api_version.to_string(),
        );

        let request = match validate_body(&event.body) {
            Ok(request) => request,
            Err(e) => {
                error!("Invalid request body: {}", e);
                return Outcome::respond(response);
            }
        };

        let token = match self.secrets.get_secret_value(&self.credential_name).await {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to get git token: {}", e);
                return Outcome::fail(response, e);
            }
        };
        info!("Retrieved git token");

        if let Err(e) = self.poster.post_commit_status(&request, &token).await {
            return Outcome::fail(response, e);
        }

        info!("Successfully triggered Git API");
        response.status_code = StatusCode::ACCEPTED;
        Outcome::respond(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::event::{HSTS_HEADER, HSTS_VALUE};
    use crate::test_support::{StubReply, StubServer, spawn_stub};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out a fixed token, or fails, and counts lookups.
    struct FixedSecret {
        value: Option<&'static str>,
        lookups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SecretResolver for FixedSecret {
        async fn get_secret_value(&self, name: &str) -> Result<SecretString> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            assert_eq!(name, "git-status-token");
            match self.value {
                Some(value) => Ok(SecretString::from(value.to_string())),
                None => Err(RelayError::secret(name, "access denied")),
            }
        }
    }

    struct Harness {
        handler: StatusHandler,
        github: StubServer,
        lookups: Arc<AtomicUsize>,
    }

    async fn harness(secret: Option<&'static str>, github_status: StatusCode) -> Harness {
        let github = spawn_stub(StubReply::new(github_status, json!({}))).await;
        let lookups = Arc::new(AtomicUsize::new(0));
        let handler = StatusHandler::new(
            "git-status-token",
            Box::new(FixedSecret {
                value: secret,
                lookups: lookups.clone(),
            }),
            StatusPoster::new(&github.base_url()).unwrap(),
        );
        Harness {
            handler,
            github,
            lookups,
        }
    }

    fn valid_body() -> String {
        json!({
            "commit": {"org": "acme", "repo": "widgets", "sha": "0123abcd"},
            "status": {
                "state": "failure",
                "description": "Tests failed",
                "context": "ci/test",
                "target_url": "https://ci.example.com/9"
            }
        })
        .to_string()
    }

    fn event(headers: &[(&str, &str)], body: String) -> ProxyRequest {
        ProxyRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            body,
            request_id: "7f3c2a10-0000-4000-8000-000000000001".to_string(),
        }
    }

    const GOOD_HEADERS: [(&str, &str); 2] =
        [("api-version", "v1"), ("content-type", "application/json")];

    fn assert_scaffold(response: &ProxyResponse) {
        assert_eq!(response.headers.get(HSTS_HEADER).map(String::as_str), Some(HSTS_VALUE));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&response.body).unwrap(),
            json!({"TraceId": "7f3c2a10-0000-4000-8000-000000000001"})
        );
    }

    #[tokio::test]
    async fn test_success_returns_accepted() {
        let h = harness(Some("ghp_token"), StatusCode::CREATED).await;

        let outcome = h.handler.handle_event(&event(&GOOD_HEADERS, valid_body())).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.response.status_code, StatusCode::ACCEPTED);
        assert_eq!(
            outcome.response.headers.get(API_VERSION_RESPONSE_HEADER).map(String::as_str),
            Some("v1")
        );
        assert_scaffold(&outcome.response);

        let seen = h.github.requests().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/repos/acme/widgets/statuses/0123abcd");
        assert_eq!(seen[0].header("authorization"), Some("Bearer ghp_token"));
        assert_eq!(
            seen[0].json(),
            json!({
                "state": "failure",
                "description": "Tests failed",
                "context": "ci/test",
                "target_url": "https://ci.example.com/9"
            })
        );
    }

    #[tokio::test]
    async fn test_bad_headers_are_soft_failures() {
        let h = harness(Some("ghp_token"), StatusCode::CREATED).await;

        let cases: [&[(&str, &str)]; 4] = [
            &[],
            &[("api-version", "v2"), ("content-type", "application/json")],
            &[("api-version", "v1")],
            &[("api-version", "v1"), ("content-type", "text/plain")],
        ];
        for headers in cases {
            let outcome = h.handler.handle_event(&event(headers, valid_body())).await;
            assert!(outcome.failure.is_none(), "{headers:?}");
            assert_eq!(outcome.response.status_code, StatusCode::BAD_REQUEST);
            assert!(!outcome.response.headers.contains_key(API_VERSION_RESPONSE_HEADER));
            assert_scaffold(&outcome.response);
        }

        assert_eq!(h.lookups.load(Ordering::SeqCst), 0);
        assert!(h.github.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_case_header_names_accepted() {
        let h = harness(Some("ghp_token"), StatusCode::CREATED).await;
        let headers = [("Api-Version", "v1"), ("Content-Type", "application/json")];

        let outcome = h.handler.handle_event(&event(&headers, valid_body())).await;
        assert_eq!(outcome.response.status_code, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_bad_body_is_soft_failure() {
        let h = harness(Some("ghp_token"), StatusCode::CREATED).await;

        for body in [String::new(), "{not json".to_string(), json!({"commit": {}}).to_string()] {
            let outcome = h.handler.handle_event(&event(&GOOD_HEADERS, body)).await;
            assert!(outcome.failure.is_none());
            assert_eq!(outcome.response.status_code, StatusCode::BAD_REQUEST);
            // The version is echoed as soon as the headers pass.
            assert_eq!(
                outcome.response.headers.get(API_VERSION_RESPONSE_HEADER).map(String::as_str),
                Some("v1")
            );
        }

        assert_eq!(h.lookups.load(Ordering::SeqCst), 0);
        assert!(h.github.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_secret_failure_is_hard_and_skips_github() {
        let h = harness(None, StatusCode::CREATED).await;

        let outcome = h.handler.handle_event(&event(&GOOD_HEADERS, valid_body())).await;

        assert_eq!(outcome.response.status_code, StatusCode::BAD_REQUEST);
        assert_scaffold(&outcome.response);
        assert!(matches!(outcome.failure, Some(RelayError::Secret { .. })));
        assert_eq!(h.lookups.load(Ordering::SeqCst), 1);
        assert!(h.github.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_rejection_is_hard_failure() {
        let h = harness(Some("ghp_token"), StatusCode::UNPROCESSABLE_ENTITY).await;

        let (response, result) = h
            .handler
            .handle_event(&event(&GOOD_HEADERS, valid_body()))
            .await
            .into_result();

        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_scaffold(&response);
        match result {
            Err(RelayError::Remote { status, .. }) => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_never_appears_in_failure() {
        let h = harness(Some("ghp_supersecret"), StatusCode::UNAUTHORIZED).await;

        let outcome = h.handler.handle_event(&event(&GOOD_HEADERS, valid_body())).await;
        let failure = outcome.failure.unwrap();
        assert!(!format!("{failure} {failure:?}").contains("ghp_supersecret"));
        assert!(!outcome.response.body.contains("ghp_supersecret"));
        assert_eq!(
            h.github.requests().await[0].header("authorization"),
            Some("Bearer ghp_supersecret")
        );
    }
}
