//! Issue tracker client
//!
//! Files notifications as issues through a GitHub-style REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{NotifyError, Result, excerpt};
use crate::format::Notification;

/// What the tracker reported back about a created issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostedIssue {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Somewhere notifications can be filed
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn post_issue(&self, notification: &Notification) -> Result<PostedIssue>;
}

/// GitHub issues API client
pub struct GitHubClient {
    issues_url: String,
    token: Option<String>,
    http: Client,
}

impl GitHubClient {
    /// `api_url` is the repository API root and must end with `/`
    pub fn new(api_url: &str, token: Option<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder().timeout(timeout).user_agent(user_agent).build()?;
        Ok(Self {
            issues_url: format!("{}issues", api_url),
            token,
            http,
        })
    }

    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self> {
        debug!(github_api_url = %config.github_api_url, authenticated = token.is_some(), "GitHubClient::from_config: called");
        Self::new(
            &config.github_api_url,
            token,
            Duration::from_millis(config.timeout_ms),
            &config.user_agent,
        )
    }

    pub fn issues_url(&self) -> &str {
        &self.issues_url
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn post_issue(&self, notification: &Notification) -> Result<PostedIssue> {
        debug!(title = %notification.title, body_len = notification.body.len(), "GitHubClient::post_issue: called");

        let payload = serde_json::json!({
            "title": notification.title,
            "body": notification.body,
        });

        let mut request = self
            .http
            .post(&self.issues_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(%status, "GitHubClient::post_issue: error status");
            return Err(NotifyError::ApiError {
                url: self.issues_url.clone(),
                status: status.as_u16(),
                message: excerpt(&text),
            });
        }

        // The issue was created even if the reply is not what we expect
        let posted: PostedIssue = serde_json::from_str(&text).unwrap_or_default();
        info!(number = ?posted.number, url = ?posted.html_url, "Issue opened");
        Ok(posted)
    }
}
