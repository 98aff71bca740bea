use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{FetchError, NormalizeError};
use crate::models::{Backend, CanonicalIssue, Status};
use crate::normalize::{map_status, non_empty, Normalizer};

const STATUS_TABLE: &[(&str, Status)] = &[
    ("new", Status::New),
    ("assigned", Status::Assigned),
    ("on_dev", Status::Assigned),
    ("in progress", Status::InProgress),
    ("post", Status::Post),
];

const MISSING_SEVERITY: &str = "unspecified";
const MISSING_PRIORITY: &str = "undefined";

const SEARCH_FIELDS: &str = "summary,assignee,status,created,priority,components,fixVersions,\
customfield_12316142,customfield_12313440";

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default, rename = "customfield_12316142")]
    pub severity: Option<SelectValue>,
    #[serde(default, rename = "customfield_12313440")]
    pub customer_facing: Option<SelectValue>,
    #[serde(default)]
    pub components: Vec<Named>,
    #[serde(default, rename = "fixVersions")]
    pub fix_versions: Vec<Named>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,
}

impl JiraUser {
    fn identity(&self) -> Option<&str> {
        non_empty(self.email_address.as_deref()).or_else(|| non_empty(self.name.as_deref()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default, rename = "startAt")]
    pub start_at: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

/// Components are named `"<component> / <sub-component>"`; names without a
/// separator are their own sub-component.
fn sub_component(component: &str) -> &str {
    component
        .rsplit_once(" / ")
        .map(|(_, sub)| sub)
        .unwrap_or(component)
        .trim()
}

pub(crate) fn normalize(
    issue: &JiraIssue,
    normalizer: &Normalizer,
    base_url: &str,
) -> Result<CanonicalIssue, NormalizeError> {
    let fields = &issue.fields;
    let status = fields
        .status
        .as_ref()
        .and_then(|status| non_empty(Some(status.name.as_str())))
        .ok_or(NormalizeError::FieldAbsent { field: "status" })?;
    let created = non_empty(fields.created.as_deref())
        .ok_or(NormalizeError::FieldAbsent { field: "created" })?;

    let severity = fields
        .severity
        .as_ref()
        .and_then(|severity| non_empty(Some(severity.value.as_str())))
        .unwrap_or(MISSING_SEVERITY)
        .to_ascii_lowercase();
    let priority = fields
        .priority
        .as_ref()
        .and_then(|priority| non_empty(Some(priority.name.as_str())))
        .unwrap_or(MISSING_PRIORITY)
        .to_ascii_lowercase();

    let severity_weight = normalizer.weights().severity_weight(&severity)?;
    let priority_weight = normalizer.weights().priority_weight(&priority)?;

    let area = normalizer
        .areas()
        .classify(fields.components.iter().map(|c| sub_component(&c.name)));
    let is_customer_facing = fields
        .customer_facing
        .as_ref()
        .is_some_and(|flag| flag.value.trim().eq_ignore_ascii_case("true"));

    Ok(CanonicalIssue {
        backend: Backend::Jira,
        id: issue.key.clone(),
        assignee: fields
            .assignee
            .as_ref()
            .and_then(JiraUser::identity)
            .map(str::to_string),
        status: map_status(STATUS_TABLE, status),
        created_at: parse_created(created)?,
        severity,
        priority,
        severity_weight,
        priority_weight,
        area,
        is_customer_facing,
        summary: fields.summary.clone(),
        url: format!("{base_url}/browse/{}", issue.key),
        component: fields
            .components
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        sub_component: None,
        target_release: fields.fix_versions.iter().map(|v| v.name.clone()).collect(),
    })
}

/// Jira timestamps come in several shapes depending on the server version
/// and the export path, so accept any of them.
fn parse_created(value: &str) -> Result<DateTime<Utc>, NormalizeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }

    Err(NormalizeError::Timestamp {
        value: value.to_string(),
    })
}

/// Which issues to pull from Jira.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JiraQuery {
    pub jql: String,
    pub page_size: u32,
}

impl Default for JiraQuery {
    fn default() -> Self {
        Self {
            jql: "project = OCPBUGS AND component in (\"Networking / ovn-kubernetes\", \
                  \"Networking / openshift-sdn\") AND statusCategory != Done"
                .to_string(),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    query: JiraQuery,
}

impl JiraClient {
    pub fn new(client: reqwest::Client, base_url: &str, token: &str, query: JiraQuery) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            query,
        }
    }

    /// Walks every result page. Any failing page fails the whole fetch.
    pub async fn fetch(&self) -> Result<Vec<JiraIssue>, FetchError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let page_size = self.query.page_size.max(1);
        let mut issues = Vec::new();
        let mut start_at: u32 = 0;

        loop {
            debug!(%url, start_at, "querying jira");
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[
                    ("jql", self.query.jql.clone()),
                    ("fields", SEARCH_FIELDS.to_string()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", page_size.to_string()),
                ])
                .send()
                .await
                .map_err(http_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    backend: Backend::Jira,
                    status,
                });
            }

            let page: SearchResponse = response.json().await.map_err(http_error)?;
            let received = page.issues.len() as u32;
            issues.extend(page.issues);

            start_at = page.start_at + received;
            if received == 0 || start_at >= page.total {
                break;
            }
        }

        info!(count = issues.len(), "fetched jira issues");
        Ok(issues)
    }
}

fn http_error(source: reqwest::Error) -> FetchError {
    FetchError::Http {
        backend: Backend::Jira,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Area;
    use crate::normalize::AreaIdentifiers;
    use crate::weights::WeightTables;
    use chrono::TimeZone;

    fn normalizer() -> Normalizer {
        Normalizer::new(
            WeightTables::default(),
            AreaIdentifiers::default(),
            "https://bugzilla.example.com",
            "https://jira.example.com/",
        )
    }

    fn sample_issue() -> JiraIssue {
        serde_json::from_str(
            r#"{
                "key": "OCPBUGS-42",
                "fields": {
                    "summary": "egress firewall ignores namespace selector",
                    "assignee": {"name": "bob", "emailAddress": "bob@example.com"},
                    "status": {"name": "In Progress"},
                    "created": "2026-07-15T08:00:00.000+0200",
                    "priority": {"name": "Major"},
                    "customfield_12316142": {"value": "Important"},
                    "customfield_12313440": {"value": "True"},
                    "components": [{"name": "Networking / openshift-sdn"}],
                    "fixVersions": [{"name": "4.17.z"}]
                }
            }"#,
        )
        .expect("valid issue json")
    }

    #[test]
    fn normalizes_a_complete_issue() {
        let issue = normalizer()
            .normalize(&crate::normalize::RawIssue::Jira(sample_issue()))
            .expect("normalizes");

        assert_eq!(issue.backend, Backend::Jira);
        assert_eq!(issue.id, "OCPBUGS-42");
        assert_eq!(issue.assignee.as_deref(), Some("bob@example.com"));
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.severity, "important");
        assert_eq!(issue.priority, "major");
        assert_eq!(issue.severity_weight, 5);
        assert_eq!(issue.priority_weight, 50);
        assert_eq!(issue.area, Area::Sdn);
        assert!(issue.is_customer_facing);
        assert_eq!(
            issue.created_at,
            Utc.with_ymd_and_hms(2026, 7, 15, 6, 0, 0).unwrap()
        );
        assert_eq!(issue.url, "https://jira.example.com/browse/OCPBUGS-42");
        assert_eq!(issue.component, "Networking / openshift-sdn");
        assert!(issue.sub_component.is_none());
        assert_eq!(issue.target_release, ["4.17.z"]);
    }

    #[test]
    fn on_dev_folds_into_assigned() {
        let mut raw = sample_issue();
        raw.fields.status = Some(Named {
            name: "ON_DEV".to_string(),
        });
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert_eq!(issue.status, Status::Assigned);

        raw.fields.status = Some(Named {
            name: "Verified".to_string(),
        });
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert_eq!(issue.status, Status::Other);
    }

    #[test]
    fn escalation_sub_component_does_not_become_an_area() {
        let mut raw = sample_issue();
        raw.fields.components = vec![Named {
            name: "Networking / escalations".to_string(),
        }];
        raw.fields.customer_facing = None;
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert_eq!(issue.area, Area::Other);
        assert!(!issue.is_customer_facing);
    }

    #[test]
    fn missing_severity_and_priority_use_placeholders() {
        let mut raw = sample_issue();
        raw.fields.severity = None;
        raw.fields.priority = None;
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert_eq!(issue.severity, "unspecified");
        assert_eq!(issue.priority, "undefined");
        assert_eq!(issue.weight(), 2);
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let mut raw = sample_issue();
        raw.fields.priority = Some(Named {
            name: "Trivial".to_string(),
        });
        assert!(matches!(
            normalize(&raw, &normalizer(), ""),
            Err(NormalizeError::Lookup { .. })
        ));
    }

    #[test]
    fn assignee_falls_back_to_login_and_blank_is_none() {
        let mut raw = sample_issue();
        raw.fields.assignee = Some(JiraUser {
            name: Some("bob".to_string()),
            email_address: None,
        });
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert_eq!(issue.assignee.as_deref(), Some("bob"));

        raw.fields.assignee = Some(JiraUser::default());
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert!(issue.assignee.is_none());

        raw.fields.assignee = None;
        let issue = normalize(&raw, &normalizer(), "").expect("normalizes");
        assert!(issue.assignee.is_none());
    }

    #[test]
    fn created_accepts_several_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 7, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_created("2026-07-15T00:00:00Z"), Ok(expected));
        assert_eq!(parse_created("2026-07-15T02:00:00.000+0200"), Ok(expected));
        assert_eq!(parse_created("2026-07-15 00:00:00"), Ok(expected));
        assert_eq!(parse_created("2026-07-15"), Ok(expected));
        assert!(parse_created("last tuesday").is_err());
    }

    #[test]
    fn missing_created_is_field_absent() {
        let mut raw = sample_issue();
        raw.fields.created = None;
        assert_eq!(
            normalize(&raw, &normalizer(), ""),
            Err(NormalizeError::FieldAbsent { field: "created" })
        );
    }

    #[test]
    fn sub_component_splits_on_separator() {
        assert_eq!(sub_component("Networking / ovn-kubernetes"), "ovn-kubernetes");
        assert_eq!(sub_component("ovn-kubernetes"), "ovn-kubernetes");
    }
}
