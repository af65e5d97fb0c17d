//! Issue rendering
//!
//! Turns [`ChangeRecord`]s into issue titles and markdown bodies, either one
//! issue per changed file or one issue for the whole run.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::{Config, NotifyMode};
use crate::detector::ChangeRecord;
use crate::repo::{ChangesetEntry, RepositoryUrls};

/// Longest body the issue tracker accepts, in characters
pub const BODY_LIMIT: usize = 60_000;

/// Appended to a body cut at [`BODY_LIMIT`]
pub const TRUNCATION_MARKER: &str = "\n(comment length limit exceeded)";

static BUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(bug(?:\s*:\s*|=|\s+)(\d+))").expect("bug pattern is valid"));

/// An issue ready to post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Renders change records into notifications
#[derive(Debug, Clone)]
pub struct Formatter {
    urls: RepositoryUrls,
    bug_url: Option<String>,
    priority_path: Option<String>,
    mode: NotifyMode,
}

impl Formatter {
    pub fn new(urls: RepositoryUrls, bug_url: Option<String>, priority_path: Option<String>, mode: NotifyMode) -> Self {
        Self {
            urls,
            bug_url,
            priority_path,
            mode,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RepositoryUrls::new(config.hg_api_url.clone()),
            config.bmo_url.clone(),
            config.priority_path.clone(),
            config.mode,
        )
    }

    /// Render according to the configured mode; empty input yields nothing
    pub fn render(&self, records: &[ChangeRecord]) -> Vec<Notification> {
        debug!(records = records.len(), mode = ?self.mode, "Formatter::render: called");
        match self.mode {
            NotifyMode::Aggregated => self.aggregated(records).into_iter().collect(),
            NotifyMode::PerPath => self.per_path(records),
        }
    }

    /// One notification per changed path
    pub fn per_path(&self, records: &[ChangeRecord]) -> Vec<Notification> {
        records
            .iter()
            .map(|record| {
                let url = self.urls.resource_url(&record.current_revision, &record.path);
                let title = format!(
                    "{} has been updated ({}...{})",
                    record.path,
                    short_rev(&record.previous_revision),
                    short_rev(&record.current_revision)
                );
                let body = format!("{}\n\n{}", url, fenced(&record.diff_text));
                Notification {
                    title,
                    body: truncate_body(body),
                }
            })
            .collect()
    }

    /// A single notification covering every changed path
    pub fn aggregated(&self, records: &[ChangeRecord]) -> Option<Notification> {
        if records.is_empty() {
            return None;
        }

        let mut sorted: Vec<&ChangeRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let changesets = collect_changesets(&sorted);

        let mut lines = vec!["# Files".to_string(), String::new()];
        for record in &sorted {
            let url = self.urls.resource_url(&record.current_revision, &record.path);
            lines.push(format!("* [`{}`]({})", record.path, url));
        }

        lines.extend(["".to_string(), "# Changesets".to_string(), String::new()]);
        for changeset in &changesets {
            lines.push(format!("* {}", self.urls.revision_url(&changeset.node)));
            lines.push(format!("  {}  ", self.linkify(changeset.subject())));
        }

        lines.extend(["".to_string(), "# Diffs".to_string(), String::new()]);
        for record in &sorted {
            let url = self.urls.resource_url(&record.current_revision, &record.path);
            lines.push(format!("## [`{}`]({})", record.path, url));
            lines.push(format!("\n{}", fenced(&record.diff_text)));
        }

        let primary = self.primary(&sorted);
        let latest = changesets
            .last()
            .map(|c| c.node.as_str())
            .unwrap_or(primary.current_revision.as_str());

        Some(Notification {
            title: aggregated_title(&primary.path, sorted.len(), latest),
            body: truncate_body(lines.join("\n")),
        })
    }

    fn primary<'r>(&self, sorted: &[&'r ChangeRecord]) -> &'r ChangeRecord {
        self.priority_path
            .as_ref()
            .and_then(|p| sorted.iter().copied().find(|r| &r.path == p))
            .unwrap_or(sorted[0])
    }

    /// Turn `bug 123` style references into bug tracker links
    pub fn linkify(&self, text: &str) -> String {
        match &self.bug_url {
            Some(bug_url) => linkify(text, bug_url),
            None => text.to_string(),
        }
    }
}

/// Turn `bug 123` style references into links under `bug_url`
pub fn linkify(text: &str, bug_url: &str) -> String {
    BUG_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            format!("[{}]({}show_bug.cgi?id={})", &caps[1], bug_url, &caps[2])
        })
        .into_owned()
}

/// Cap `body` at [`BODY_LIMIT`] characters
pub fn truncate_body(body: String) -> String {
    match body.char_indices().nth(BODY_LIMIT) {
        Some((idx, _)) => {
            debug!(chars = body.chars().count(), "truncate_body: body over limit");
            format!("{}{}", &body[..idx], TRUNCATION_MARKER)
        }
        None => body,
    }
}

/// Title for an aggregated issue
pub fn aggregated_title(primary: &str, changed: usize, latest_rev: &str) -> String {
    let summary = match changed {
        0 | 1 => format!("{} has been updated", primary),
        2 => format!("{} and one more file have been updated", primary),
        n => format!("{} and {} more files have been updated", primary, n - 1),
    };
    format!("{} ({})", summary, short_rev(latest_rev))
}

/// First 8 characters of a revision id
pub fn short_rev(rev: &str) -> &str {
    match rev.char_indices().nth(8) {
        Some((idx, _)) => &rev[..idx],
        None => rev,
    }
}

/// Unique changesets across records, oldest push first
fn collect_changesets<'r>(records: &[&'r ChangeRecord]) -> Vec<&'r ChangesetEntry> {
    let mut seen = HashSet::new();
    let mut changesets: Vec<&ChangesetEntry> = records
        .iter()
        .flat_map(|r| r.changesets.iter())
        .filter(|c| seen.insert(c.node.as_str()))
        .collect();
    changesets.sort_by_key(|c| c.pushed_at());
    changesets
}

fn fenced(diff: &str) -> String {
    if diff.is_empty() || diff.ends_with('\n') {
        format!("```\n{}```\n", diff)
    } else {
        format!("```\n{}\n```\n", diff)
    }
}
