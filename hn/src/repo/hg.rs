//! hgweb HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ChangesetEntry, RepositoryApi, RepositoryUrls};
use crate::config::Config;
use crate::error::{NotifyError, Result, excerpt};

#[derive(Debug, Deserialize)]
struct LogResponse {
    entries: Vec<ChangesetEntry>,
}

/// Read-only client for an hgweb repository
pub struct HgClient {
    urls: RepositoryUrls,
    http: Client,
}

impl HgClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder().timeout(timeout).user_agent(user_agent).build()?;
        Ok(Self {
            urls: RepositoryUrls::new(base_url),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        debug!(hg_api_url = %config.hg_api_url, "HgClient::from_config: called");
        Self::new(
            config.hg_api_url.clone(),
            Duration::from_millis(config.timeout_ms),
            &config.user_agent,
        )
    }

    async fn call(&self, name: &str, rev: &str, path: &str) -> Result<(String, Vec<u8>)> {
        let url = self.urls.endpoint(name, rev, path);
        debug!(%url, "HgClient::call: sending request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%url, %status, "HgClient::call: error status");
            return Err(NotifyError::ApiError {
                url,
                status: status.as_u16(),
                message: excerpt(&message),
            });
        }

        let body = response.bytes().await?;
        debug!(%url, len = body.len(), "HgClient::call: response received");
        Ok((url, body.to_vec()))
    }
}

#[async_trait]
impl RepositoryApi for HgClient {
    async fn log(&self, rev: &str, path: &str) -> Result<Vec<ChangesetEntry>> {
        let (url, body) = self.call("json-log", rev, path).await?;
        let parsed: LogResponse = serde_json::from_slice(&body).map_err(|e| NotifyError::Protocol {
            url,
            message: e.to_string(),
        })?;
        Ok(parsed.entries)
    }

    async fn raw_file(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        let (_, body) = self.call("raw-file", rev, path).await?;
        Ok(body)
    }
}
