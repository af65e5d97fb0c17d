//! One notification run: detect, render, post

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Config, load_token};
use crate::detector::{ChangeDetector, ChangeRecord};
use crate::diff::create_differ;
use crate::error::Result;
use crate::format::{Formatter, Notification};
use crate::repo::{HgClient, RepositoryApi, RepositoryClient, RepositoryUrls};
use crate::state::StateStore;
use crate::tracker::{GitHubClient, IssueTracker, PostedIssue};

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub changes: Vec<ChangeRecord>,
    pub notifications: Vec<Notification>,
    /// Empty on a dry run
    pub posted: Vec<PostedIssue>,
}

/// Owns every collaborator for a single run
pub struct Runner {
    config: Config,
    repo: RepositoryClient,
    tracker: Arc<dyn IssueTracker>,
    store: StateStore,
    formatter: Formatter,
}

impl Runner {
    /// Wire up the HTTP clients described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        debug!("Runner::from_config: called");
        let token = load_token(&config.token_path)?;
        let api = Arc::new(HgClient::from_config(&config)?);
        let tracker = Arc::new(GitHubClient::from_config(&config, token)?);
        Ok(Self::new(config, api, tracker))
    }

    /// Build a runner around caller-provided endpoints
    pub fn new(config: Config, api: Arc<dyn RepositoryApi>, tracker: Arc<dyn IssueTracker>) -> Self {
        let repo = RepositoryClient::new(
            api,
            create_differ(&config),
            RepositoryUrls::new(config.hg_api_url.clone()),
        );
        let store = StateStore::new(config.state_path.clone());
        let formatter = Formatter::from_config(&config);
        Self {
            config,
            repo,
            tracker,
            store,
            formatter,
        }
    }

    /// Run once
    ///
    /// With `dry_run` the notifications are logged but neither posted nor
    /// checkpointed, so the next real run reports the same changes.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary> {
        info!(
            files = self.config.files.len(),
            mode = ?self.config.mode,
            dry_run,
            "Starting run"
        );

        let detector = ChangeDetector::new(&self.repo);
        let changes = detector
            .check(&self.config.files, &self.store, self.config.persist_state && !dry_run)
            .await?;

        let notifications = self.formatter.render(&changes);
        if notifications.is_empty() {
            info!("No changes");
            return Ok(RunSummary {
                changes,
                ..Default::default()
            });
        }

        let mut posted = Vec::new();
        for notification in &notifications {
            info!("Opening issue");
            info!("title: {}", notification.title);
            debug!("body: {}", notification.body);

            if dry_run {
                info!("Dry run, not posting");
                continue;
            }
            posted.push(self.tracker.post_issue(notification).await?);
        }

        Ok(RunSummary {
            changes,
            notifications,
            posted,
        })
    }
}
