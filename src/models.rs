use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Backend {
    Bugzilla,
    Jira,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::Bugzilla => "bugzilla",
            Backend::Jira => "jira",
        }
    }

    /// Bugzilla flags untriaged work for everyone in the component, Jira only
    /// for the people on the roster.
    pub fn stale_policy(self) -> StalePolicy {
        match self {
            Backend::Bugzilla => StalePolicy::AllIssues,
            Backend::Jira => StalePolicy::RosterOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePolicy {
    AllIssues,
    RosterOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    New,
    Assigned,
    InProgress,
    Post,
    Other,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::Assigned => "ASSIGNED",
            Status::InProgress => "IN PROGRESS",
            Status::Post => "POST",
            Status::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Area {
    Ovn,
    Sdn,
    Escalation,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalIssue {
    pub backend: Backend,
    pub id: String,
    pub assignee: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub severity: String,
    pub priority: String,
    pub severity_weight: u32,
    pub priority_weight: u32,
    pub area: Area,
    pub is_customer_facing: bool,
    pub summary: String,
    pub url: String,
    pub component: String,
    pub sub_component: Option<String>,
    pub target_release: Vec<String>,
}

impl CanonicalIssue {
    pub fn weight(&self) -> u64 {
        u64::from(self.severity_weight) + u64::from(self.priority_weight)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub new: u32,
    pub assigned: u32,
    pub post: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssigneeStats {
    pub score: u64,
    pub total_issues: u32,
    pub escalations: u32,
    pub ovn_issues: u32,
    pub sdn_issues: u32,
    pub other_issues: u32,
    pub by_status: StatusCounts,
    pub issue_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StaleKey {
    pub backend: Backend,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleIssue {
    pub summary: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub status: Status,
    pub component: String,
    pub target_release: Vec<String>,
    pub sub_component: Option<String>,
}

impl From<&CanonicalIssue> for StaleIssue {
    fn from(issue: &CanonicalIssue) -> Self {
        Self {
            summary: issue.summary.clone(),
            url: issue.url.clone(),
            created_at: issue.created_at,
            status: issue.status,
            component: issue.component.clone(),
            target_release: issue.target_release.clone(),
            sub_component: issue.sub_component.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_use_tracker_spelling() {
        let labels: Vec<&str> = [
            Status::New,
            Status::Assigned,
            Status::InProgress,
            Status::Post,
            Status::Other,
        ]
        .into_iter()
        .map(Status::label)
        .collect();
        assert_eq!(labels, ["NEW", "ASSIGNED", "IN PROGRESS", "POST", "OTHER"]);
    }
}
