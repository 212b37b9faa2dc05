//! Outbound calls to the GitHub commit status API

use axum::http::StatusCode;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info};

use crate::error::{RelayError, Result};
use crate::status::StatusRequest;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const MAX_ERROR_BODY_LEN: usize = 500;

/// Posts commit statuses. Holds one HTTP client for the life of the process.
pub struct StatusPoster {
    client: reqwest::Client,
    api_base: Url,
}

impl StatusPoster {
    pub fn new(api_base: &str) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            RelayError::ConfigError(format!("Invalid GitHub API URL '{}': {}", api_base, e))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(RelayError::ConfigError(format!(
                "GitHub API URL '{}' cannot be used as a base",
                api_base
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, api_base })
    }

    /// `{api_base}/repos/{org}/{repo}/statuses/{sha}`, each segment percent-encoded.
    pub fn statuses_url(&self, request: &StatusRequest) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "repos",
                request.commit.org.as_str(),
                request.commit.repo.as_str(),
                "statuses",
                request.commit.sha.as_str(),
            ]);
        }
        url
    }

    /// Sends the status part of `request` once. Only `201 Created` counts as success.
    pub async fn post_commit_status(
        &self,
        request: &StatusRequest,
        token: &SecretString,
    ) -> Result<()> {
        let url = self.statuses_url(request);
        debug!("Posting commit status to {}", url);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .bearer_auth(token.expose_secret())
            .json(&request.status)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request: {}", e);
                RelayError::Transport(e)
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            error!("Failed to post status: {} {}", status, body);
            return Err(RelayError::Remote { status, body });
        }

        info!(
            "Posted '{}' status for {}/{}@{}",
            request.status.state, request.commit.org, request.commit.repo, request.commit.sha
        );
        Ok(())
    }
}
