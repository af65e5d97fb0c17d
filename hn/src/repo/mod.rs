//! Remote repository access
//!
//! [`RepositoryApi`] is the raw hgweb surface (log and raw-file endpoints).
//! [`RepositoryClient`] layers revision lookup and diffing on top of it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::diff::LineDiffer;
use crate::error::{NotifyError, Result};

mod hg;

pub use hg::HgClient;

/// Revision that always names the repository head
pub const TIP: &str = "tip";

/// One entry of a file's change log
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangesetEntry {
    pub node: String,
    #[serde(default)]
    pub desc: String,
    /// `[unix seconds, timezone offset]`
    #[serde(default)]
    pub pushdate: (i64, i64),
}

impl ChangesetEntry {
    /// Push time in unix seconds
    pub fn pushed_at(&self) -> i64 {
        self.pushdate.0
    }

    /// First line of the commit message
    pub fn subject(&self) -> &str {
        self.desc.lines().next().unwrap_or("")
    }
}

/// Raw hgweb endpoints
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Change log of `path` starting at `rev`, most recent first
    async fn log(&self, rev: &str, path: &str) -> Result<Vec<ChangesetEntry>>;

    /// Raw bytes of `path` at `rev`
    async fn raw_file(&self, rev: &str, path: &str) -> Result<Vec<u8>>;
}

/// Browsable URL construction for an hgweb repository
#[derive(Debug, Clone)]
pub struct RepositoryUrls {
    base: String,
}

impl RepositoryUrls {
    /// `base` must end with `/`
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn resource_url(&self, rev: &str, path: &str) -> String {
        format!("{}file/{}{}", self.base, rev, path)
    }

    pub fn revision_url(&self, rev: &str) -> String {
        format!("{}rev/{}", self.base, rev)
    }

    pub(crate) fn endpoint(&self, name: &str, rev: &str, path: &str) -> String {
        format!("{}{}/{}{}", self.base, name, rev, path)
    }
}

/// A path's change log fetched at tip
#[derive(Debug, Clone)]
pub struct PathLog {
    path: String,
    entries: Vec<ChangesetEntry>,
}

impl PathLog {
    /// The most recent revision
    pub fn latest(&self) -> &str {
        // Constructed only from non-empty logs
        &self.entries[0].node
    }

    /// Entries newer than `stop`, most recent first
    ///
    /// When `stop` is not in the log (history rewritten, or the log window is
    /// shorter than the gap) every entry is returned.
    pub fn since(&self, stop: &str) -> Vec<ChangesetEntry> {
        let collected: Vec<ChangesetEntry> = self.entries.iter().take_while(|c| c.node != stop).cloned().collect();
        if collected.len() == self.entries.len() {
            warn!(path = %self.path, %stop, "Stored revision not found in log, reporting the full log");
        }
        collected
    }
}

/// Revision lookup and diffing for tracked paths
pub struct RepositoryClient {
    api: Arc<dyn RepositoryApi>,
    differ: Box<dyn LineDiffer>,
    urls: RepositoryUrls,
}

impl RepositoryClient {
    pub fn new(api: Arc<dyn RepositoryApi>, differ: Box<dyn LineDiffer>, urls: RepositoryUrls) -> Self {
        Self { api, differ, urls }
    }

    /// Fetch the log for `path` at tip
    pub async fn log_at_tip(&self, path: &str) -> Result<PathLog> {
        debug!(%path, "RepositoryClient::log_at_tip: called");
        let entries = self.api.log(TIP, path).await?;
        if entries.is_empty() {
            return Err(NotifyError::Protocol {
                url: self.urls.endpoint("json-log", TIP, path),
                message: "log has no entries".to_string(),
            });
        }
        debug!(%path, entries = entries.len(), latest = %entries[0].node, "RepositoryClient::log_at_tip: fetched");
        Ok(PathLog {
            path: path.to_string(),
            entries,
        })
    }

    pub async fn latest_revision(&self, path: &str) -> Result<String> {
        Ok(self.log_at_tip(path).await?.latest().to_string())
    }

    pub async fn changesets_since(&self, path: &str, stop: &str) -> Result<Vec<ChangesetEntry>> {
        Ok(self.log_at_tip(path).await?.since(stop))
    }

    /// Unified diff of `path` between two revisions
    ///
    /// Header labels are `<rev><path>` so the output names revisions rather
    /// than scratch files.
    pub async fn diff(&self, path: &str, rev_a: &str, rev_b: &str) -> Result<String> {
        debug!(%path, %rev_a, %rev_b, "RepositoryClient::diff: called");
        let old = self.api.raw_file(rev_a, path).await?;
        let new = self.api.raw_file(rev_b, path).await?;

        let old_label = format!("{}{}", rev_a, path);
        let new_label = format!("{}{}", rev_b, path);
        self.differ.diff_lines(&old, &new, &old_label, &new_label)
    }

    pub fn resource_url(&self, rev: &str, path: &str) -> String {
        self.urls.resource_url(rev, path)
    }

    pub fn revision_url(&self, rev: &str) -> String {
        self.urls.revision_url(rev)
    }
}
