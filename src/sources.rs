use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bugzilla::{BugSearchResponse, BugzillaClient};
use crate::error::FetchError;
use crate::jira::{JiraClient, SearchResponse};
use crate::models::Backend;
use crate::normalize::RawIssue;

/// Where one backend's records come from for this run.
#[derive(Debug, Clone)]
pub enum Source<C> {
    Live(C),
    Snapshot(PathBuf),
    Disabled,
}

impl Source<BugzillaClient> {
    pub async fn load(&self) -> Result<Vec<RawIssue>, FetchError> {
        let bugs = match self {
            Source::Live(client) => client.fetch().await?,
            Source::Snapshot(path) => {
                read_snapshot::<BugSearchResponse>(Backend::Bugzilla, path)?.bugs
            }
            Source::Disabled => Vec::new(),
        };
        Ok(bugs.into_iter().map(RawIssue::Bugzilla).collect())
    }
}

impl Source<JiraClient> {
    pub async fn load(&self) -> Result<Vec<RawIssue>, FetchError> {
        let issues = match self {
            Source::Live(client) => client.fetch().await?,
            Source::Snapshot(path) => read_snapshot::<SearchResponse>(Backend::Jira, path)?.issues,
            Source::Disabled => Vec::new(),
        };
        Ok(issues.into_iter().map(RawIssue::Jira).collect())
    }
}

fn read_snapshot<T: serde::de::DeserializeOwned>(
    backend: Backend,
    path: &Path,
) -> Result<T, FetchError> {
    let raw = std::fs::read_to_string(path).map_err(|source| FetchError::Snapshot {
        backend,
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| FetchError::Decode {
        backend,
        path: path.display().to_string(),
        source,
    })
}

/// Raw records per backend, in the order they are folded.
#[derive(Debug, Default)]
pub struct Batches {
    pub bugzilla: Vec<RawIssue>,
    pub jira: Vec<RawIssue>,
}

impl Batches {
    pub fn in_fold_order(&self) -> [(Backend, &[RawIssue]); 2] {
        [
            (Backend::Bugzilla, self.bugzilla.as_slice()),
            (Backend::Jira, self.jira.as_slice()),
        ]
    }
}

/// Loads both backends concurrently. A backend that fails contributes an
/// empty batch; the other is unaffected.
pub async fn fetch_all(bugzilla: &Source<BugzillaClient>, jira: &Source<JiraClient>) -> Batches {
    let (bugzilla, jira) = tokio::join!(bugzilla.load(), jira.load());

    Batches {
        bugzilla: or_empty(Backend::Bugzilla, bugzilla),
        jira: or_empty(Backend::Jira, jira),
    }
}

fn or_empty(backend: Backend, result: Result<Vec<RawIssue>, FetchError>) -> Vec<RawIssue> {
    match result {
        Ok(records) => {
            info!(backend = backend.label(), count = records.len(), "loaded records");
            records
        }
        Err(err) => {
            warn!(backend = backend.label(), error = %err, "fetch failed, continuing without it");
            Vec::new()
        }
    }
}
