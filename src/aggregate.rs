use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::models::{Area, AssigneeStats, CanonicalIssue, StaleIssue, StaleKey, StalePolicy, Status};
use crate::normalize::{Normalizer, RawIssue};
use crate::roster::{Roster, Workload};

/// Everything a batch pass produces: the roster's statistics and the issues
/// left untriaged for too long.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub workload: Workload,
    pub stale: BTreeMap<StaleKey, StaleIssue>,
}

impl Aggregation {
    pub fn new(roster: &Roster) -> Self {
        Self {
            workload: roster.zeroed_stats(),
            stale: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub folded: usize,
    pub dropped: usize,
}

pub struct Aggregator {
    normalizer: Normalizer,
    threshold_days: i64,
    now: DateTime<Utc>,
}

impl Aggregator {
    pub fn new(normalizer: Normalizer, threshold_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            normalizer,
            threshold_days: threshold_days.max(0),
            now,
        }
    }

    pub fn threshold_days(&self) -> i64 {
        self.threshold_days
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// New and older than the threshold. An issue exactly at the threshold is
    /// not stale yet, and nothing is stale under a threshold chrono cannot
    /// represent.
    pub fn is_stale(&self, issue: &CanonicalIssue) -> bool {
        issue.status == Status::New
            && Duration::try_days(self.threshold_days)
                .is_some_and(|threshold| self.now - issue.created_at > threshold)
    }

    /// Normalizes and folds one backend's records. Records that fail to
    /// normalize are logged and skipped; the rest of the batch still folds.
    pub fn ingest(&self, records: &[RawIssue], state: &mut Aggregation) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for record in records {
            match self.normalizer.normalize(record) {
                Ok(issue) => {
                    self.fold_issue(&issue, state);
                    summary.folded += 1;
                }
                Err(err) => {
                    warn!(
                        backend = record.backend().label(),
                        id = %record.id(),
                        error = %err,
                        "dropping record"
                    );
                    summary.dropped += 1;
                }
            }
        }

        info!(
            folded = summary.folded,
            dropped = summary.dropped,
            stale = state.stale.len(),
            "ingested batch"
        );
        summary
    }

    /// Folds already normalized issues in order.
    pub fn fold(&self, issues: &[CanonicalIssue], state: &mut Aggregation) {
        for issue in issues {
            self.fold_issue(issue, state);
        }
    }

    fn fold_issue(&self, issue: &CanonicalIssue, state: &mut Aggregation) {
        let policy = issue.backend.stale_policy();
        if policy == StalePolicy::AllIssues {
            self.record_if_stale(issue, &mut state.stale);
        }

        let Some(stats) = issue
            .assignee
            .as_deref()
            .and_then(|assignee| state.workload.get_mut(assignee))
        else {
            debug!(
                backend = issue.backend.label(),
                id = %issue.id,
                status = issue.status.label(),
                assignee = issue.assignee.as_deref().unwrap_or("<none>"),
                "assignee not on roster"
            );
            return;
        };

        count_status(stats, issue.status);

        if policy == StalePolicy::RosterOnly {
            self.record_if_stale(issue, &mut state.stale);
        }

        stats.total_issues += 1;
        match issue.area {
            Area::Ovn => stats.ovn_issues += 1,
            Area::Sdn => stats.sdn_issues += 1,
            Area::Escalation => stats.escalations += 1,
            Area::Other => stats.other_issues += 1,
        }
        if issue.is_customer_facing {
            stats.escalations += 1;
        }

        stats.issue_urls.push(issue.url.clone());
        stats.score += issue.weight();
    }

    fn record_if_stale(&self, issue: &CanonicalIssue, stale: &mut BTreeMap<StaleKey, StaleIssue>) {
        if !self.is_stale(issue) {
            return;
        }

        let key = StaleKey {
            backend: issue.backend,
            id: issue.id.clone(),
        };
        stale.insert(key, StaleIssue::from(issue));
    }
}

fn count_status(stats: &mut AssigneeStats, status: Status) {
    match status {
        Status::New => stats.by_status.new += 1,
        Status::Assigned | Status::InProgress => stats.by_status.assigned += 1,
        Status::Post => stats.by_status.post += 1,
        Status::Other => {}
    }
}
