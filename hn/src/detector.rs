//! Change detection across tracked paths

use tracing::{debug, info};

use crate::error::Result;
use crate::repo::{ChangesetEntry, RepositoryClient};
use crate::state::{PersistedState, StateStore};

/// A tracked path whose revision moved since the last run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: String,
    pub previous_revision: String,
    pub current_revision: String,
    pub diff_text: String,
    /// Changesets between the two revisions, most recent first
    pub changesets: Vec<ChangesetEntry>,
}

/// Walks tracked paths and compares them against the checkpoint
pub struct ChangeDetector<'a> {
    repo: &'a RepositoryClient,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(repo: &'a RepositoryClient) -> Self {
        Self { repo }
    }

    /// Load state, detect, write state back (when `persist`) and return the changes
    ///
    /// Any error aborts before the state is written, so the next run starts
    /// again from the last saved checkpoint.
    pub async fn check(&self, files: &[String], store: &StateStore, persist: bool) -> Result<Vec<ChangeRecord>> {
        debug!(files = files.len(), persist, "ChangeDetector::check: called");
        let mut state = store.load()?;

        let records = self.detect(files, &mut state).await?;

        if persist {
            store.save(&state)?;
            debug!(path = %store.path().display(), "ChangeDetector::check: state saved");
        } else {
            info!("Not saving state, {} left untouched", store.path().display());
        }

        Ok(records)
    }

    /// Compare every path with `state`, advancing `state` to the latest revisions
    pub async fn detect(&self, files: &[String], state: &mut PersistedState) -> Result<Vec<ChangeRecord>> {
        let mut records = Vec::new();

        for path in files {
            info!("Checking {}", path);

            let log = self.repo.log_at_tip(path).await?;
            let latest = log.latest().to_string();

            match state.get(path) {
                None => {
                    debug!(%path, %latest, "ChangeDetector::detect: first sighting, recording baseline");
                }
                Some(previous) if *previous == latest => {
                    debug!(%path, %latest, "ChangeDetector::detect: unchanged");
                }
                Some(previous) => {
                    info!("{} changed: {} -> {}", path, previous, latest);
                    let diff_text = self.repo.diff(path, previous, &latest).await?;
                    let changesets = log.since(previous);
                    records.push(ChangeRecord {
                        path: path.clone(),
                        previous_revision: previous.clone(),
                        current_revision: latest.clone(),
                        diff_text,
                        changesets,
                    });
                }
            }

            state.insert(path.clone(), latest);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::InProcessDiffer;
    use crate::repo::RepositoryUrls;
    use crate::repo::mock::MockRepositoryApi;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn client(api: MockRepositoryApi) -> RepositoryClient {
        RepositoryClient::new(
            Arc::new(api),
            Box::new(InProcessDiffer),
            RepositoryUrls::new("https://hg.example.org/repo/"),
        )
    }

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn repo_with_two_files() -> MockRepositoryApi {
        let mut api = MockRepositoryApi::new();
        api.push("/a.h", "a1", "Bug 10 - add a", 100, "a\n");
        api.push("/a.h", "a2", "Bug 11 - change a", 200, "a\nb\n");
        api.push("/b.h", "b1", "Bug 20 - add b", 150, "b\n");
        api
    }

    #[tokio::test]
    async fn test_first_run_records_baseline_without_changes() {
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);
        let mut state = PersistedState::new();

        let records = detector.detect(&files(&["/a.h", "/b.h"]), &mut state).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(state.get("/a.h").map(String::as_str), Some("a2"));
        assert_eq!(state.get("/b.h").map(String::as_str), Some("b1"));
    }

    #[tokio::test]
    async fn test_unchanged_path_produces_nothing() {
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);
        let mut state = PersistedState::from([("/a.h".to_string(), "a2".to_string())]);

        let records = detector.detect(&files(&["/a.h"]), &mut state).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(state["/a.h"], "a2");
    }

    #[tokio::test]
    async fn test_changed_path_produces_one_record() {
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);
        let mut state = PersistedState::from([
            ("/a.h".to_string(), "a1".to_string()),
            ("/b.h".to_string(), "b1".to_string()),
        ]);

        let records = detector.detect(&files(&["/a.h", "/b.h"]), &mut state).await.unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.path, "/a.h");
        assert_eq!(record.previous_revision, "a1");
        assert_eq!(record.current_revision, "a2");
        assert!(record.diff_text.contains("+b\n"));
        assert_eq!(record.changesets.len(), 1);
        assert_eq!(record.changesets[0].node, "a2");
        assert_eq!(state["/a.h"], "a2");
    }

    #[tokio::test]
    async fn test_unchanged_paths_skip_raw_file_fetches() {
        let api = Arc::new(repo_with_two_files());
        let client = RepositoryClient::new(
            api.clone(),
            Box::new(InProcessDiffer),
            RepositoryUrls::new("https://hg.example.org/repo/"),
        );
        let detector = ChangeDetector::new(&client);
        let mut state = PersistedState::from([("/b.h".to_string(), "b1".to_string())]);

        detector.detect(&files(&["/b.h"]), &mut state).await.unwrap();

        assert_eq!(api.calls(), vec!["json-log/tip/b.h".to_string()]);
    }

    #[tokio::test]
    async fn test_check_persists_state() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("status.json"));
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);

        let records = detector.check(&files(&["/a.h"]), &store, true).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(store.load().unwrap()["/a.h"], "a2");
    }

    #[tokio::test]
    async fn test_check_without_persistence_leaves_file_alone() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("status.json"));
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);

        detector.check(&files(&["/a.h"]), &store, false).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_failure_aborts_before_state_write() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("status.json"));
        let client = client(repo_with_two_files());
        let detector = ChangeDetector::new(&client);

        let result = detector.check(&files(&["/a.h", "/missing.h"]), &store, true).await;
        assert!(result.is_err());
        assert!(!store.path().exists());
    }
}
