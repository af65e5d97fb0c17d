//! hgnotify - change notifications for files in a Mercurial repository
//!
//! Polls an hgweb repository for new revisions of a fixed set of files, diffs
//! each changed file against the last revision seen, and files an issue on a
//! GitHub-style tracker summarizing what moved.
//!
//! # Flow
//!
//! ```text
//! status.json ──► ChangeDetector ──► Formatter ──► IssueTracker
//!                     │    ▲
//!                     ▼    │
//!               RepositoryClient ──► LineDiffer
//! ```
//!
//! # Modules
//!
//! - [`config`] - Configuration types, loading and token resolution
//! - [`state`] - Last-seen revision checkpoint
//! - [`repo`] - hgweb client, URLs and revision lookup
//! - [`diff`] - In-process and external line differs
//! - [`detector`] - Per-path change detection
//! - [`format`] - Issue titles and bodies
//! - [`tracker`] - Issue tracker client
//! - [`runner`] - One end-to-end run
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod detector;
pub mod diff;
pub mod error;
pub mod format;
pub mod repo;
pub mod runner;
pub mod state;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use config::{Config, DiffTool, NotifyMode, load_token};
pub use detector::{ChangeDetector, ChangeRecord};
pub use diff::{ExternalDiffer, InProcessDiffer, LineDiffer, create_differ};
pub use error::{NotifyError, Result};
pub use format::{Formatter, Notification};
pub use repo::{ChangesetEntry, HgClient, PathLog, RepositoryApi, RepositoryClient, RepositoryUrls};
pub use runner::{RunSummary, Runner};
pub use state::{PersistedState, StateStore};
pub use tracker::{GitHubClient, IssueTracker, PostedIssue};
