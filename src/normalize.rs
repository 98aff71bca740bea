use serde::Deserialize;

use crate::bugzilla::{self, BugzillaBug};
use crate::error::NormalizeError;
use crate::jira::{self, JiraIssue};
use crate::models::{Area, Backend, CanonicalIssue, Status};
use crate::weights::WeightTables;

/// A record as handed over by one backend's fetcher.
#[derive(Debug, Clone)]
pub enum RawIssue {
    Bugzilla(BugzillaBug),
    Jira(JiraIssue),
}

impl RawIssue {
    pub fn backend(&self) -> Backend {
        match self {
            RawIssue::Bugzilla(_) => Backend::Bugzilla,
            RawIssue::Jira(_) => Backend::Jira,
        }
    }

    pub fn id(&self) -> String {
        match self {
            RawIssue::Bugzilla(bug) => bug.id.to_string(),
            RawIssue::Jira(issue) => issue.key.clone(),
        }
    }
}

/// Sub-component names that place an issue in a subsystem bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AreaIdentifiers {
    pub ovn: String,
    pub sdn: String,
    pub escalation: String,
}

impl Default for AreaIdentifiers {
    fn default() -> Self {
        Self {
            ovn: "ovn-kubernetes".to_string(),
            sdn: "openshift-sdn".to_string(),
            escalation: "escalations".to_string(),
        }
    }
}

impl AreaIdentifiers {
    /// Escalation competes with the subsystems for the same field. First
    /// match wins in the order OVN, SDN, escalation.
    pub fn classify_exclusive<'a>(&self, candidates: impl IntoIterator<Item = &'a str> + Clone) -> Area {
        if contains_ignore_case(candidates.clone(), &self.ovn) {
            Area::Ovn
        } else if contains_ignore_case(candidates.clone(), &self.sdn) {
            Area::Sdn
        } else if contains_ignore_case(candidates, &self.escalation) {
            Area::Escalation
        } else {
            Area::Other
        }
    }

    /// Subsystem only; escalation is tracked by a separate signal.
    pub fn classify<'a>(&self, candidates: impl IntoIterator<Item = &'a str> + Clone) -> Area {
        if contains_ignore_case(candidates.clone(), &self.ovn) {
            Area::Ovn
        } else if contains_ignore_case(candidates, &self.sdn) {
            Area::Sdn
        } else {
            Area::Other
        }
    }

    /// The configured identifier that classifies into `area`, if any.
    pub fn identifier(&self, area: Area) -> Option<&str> {
        match area {
            Area::Ovn => Some(&self.ovn),
            Area::Sdn => Some(&self.sdn),
            Area::Escalation => Some(&self.escalation),
            Area::Other => None,
        }
    }
}

fn contains_ignore_case<'a>(candidates: impl IntoIterator<Item = &'a str>, needle: &str) -> bool {
    candidates
        .into_iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(needle))
}

/// Case-insensitive exact match against a backend status table.
pub(crate) fn map_status(table: &[(&str, Status)], value: &str) -> Status {
    let value = value.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, status)| *status)
        .unwrap_or(Status::Other)
}

/// Empty or whitespace-only strings count as missing.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Everything a backend normalizer needs besides the record itself.
#[derive(Debug, Clone)]
pub struct Normalizer {
    weights: WeightTables,
    areas: AreaIdentifiers,
    bugzilla_url: String,
    jira_url: String,
}

impl Normalizer {
    pub fn new(
        weights: WeightTables,
        areas: AreaIdentifiers,
        bugzilla_url: impl Into<String>,
        jira_url: impl Into<String>,
    ) -> Self {
        Self {
            weights,
            areas,
            bugzilla_url: bugzilla_url.into().trim_end_matches('/').to_string(),
            jira_url: jira_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn weights(&self) -> &WeightTables {
        &self.weights
    }

    pub fn areas(&self) -> &AreaIdentifiers {
        &self.areas
    }

    pub fn normalize(&self, raw: &RawIssue) -> Result<CanonicalIssue, NormalizeError> {
        match raw {
            RawIssue::Bugzilla(bug) => bugzilla::normalize(bug, self, &self.bugzilla_url),
            RawIssue::Jira(issue) => jira::normalize(issue, self, &self.jira_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_classification_prefers_subsystems_over_escalation() {
        let areas = AreaIdentifiers::default();
        assert_eq!(
            areas.classify_exclusive(["escalations", "ovn-kubernetes"]),
            Area::Ovn
        );
        assert_eq!(
            areas.classify_exclusive(["escalations", "OpenShift-SDN"]),
            Area::Sdn
        );
        assert_eq!(areas.classify_exclusive(["escalations"]), Area::Escalation);
        assert_eq!(areas.classify_exclusive(["multus"]), Area::Other);
        assert_eq!(areas.classify_exclusive(Vec::<&str>::new()), Area::Other);
    }

    #[test]
    fn identifier_names_the_configured_value_per_area() {
        let areas = AreaIdentifiers::default();
        assert_eq!(areas.identifier(Area::Ovn), Some("ovn-kubernetes"));
        assert_eq!(areas.identifier(Area::Escalation), Some("escalations"));
        assert_eq!(areas.identifier(Area::Other), None);
    }

    #[test]
    fn independent_classification_never_yields_escalation() {
        let areas = AreaIdentifiers::default();
        assert_eq!(areas.classify(["escalations"]), Area::Other);
        assert_eq!(areas.classify(["ovn-kubernetes"]), Area::Ovn);
    }

    #[test]
    fn status_table_falls_back_to_other() {
        let table = [("NEW", Status::New), ("POST", Status::Post)];
        assert_eq!(map_status(&table, "new"), Status::New);
        assert_eq!(map_status(&table, " POST "), Status::Post);
        assert_eq!(map_status(&table, "MODIFIED"), Status::Other);
    }

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" alice ")), Some("alice"));
    }
}
