use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{FetchError, NormalizeError};
use crate::models::{Backend, CanonicalIssue, Status};
use crate::normalize::{map_status, non_empty, Normalizer};

const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const STATUS_TABLE: &[(&str, Status)] = &[
    ("NEW", Status::New),
    ("ASSIGNED", Status::Assigned),
    ("POST", Status::Post),
];

const INCLUDE_FIELDS: &str = "id,summary,status,assigned_to,severity,priority,creation_time,\
component,sub_components,target_release";

/// A bug as returned by the Bugzilla REST `bug` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BugzillaBug {
    pub id: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub component: Vec<String>,
    #[serde(default)]
    pub sub_components: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub target_release: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BugSearchResponse {
    #[serde(default)]
    pub bugs: Vec<BugzillaBug>,
}

pub(crate) fn normalize(
    bug: &BugzillaBug,
    normalizer: &Normalizer,
    base_url: &str,
) -> Result<CanonicalIssue, NormalizeError> {
    let status = non_empty(bug.status.as_deref())
        .ok_or(NormalizeError::FieldAbsent { field: "status" })?;
    let severity = non_empty(bug.severity.as_deref())
        .ok_or(NormalizeError::FieldAbsent { field: "severity" })?
        .to_ascii_lowercase();
    let priority = non_empty(bug.priority.as_deref())
        .ok_or(NormalizeError::FieldAbsent { field: "priority" })?
        .to_ascii_lowercase();
    let created = non_empty(bug.creation_time.as_deref())
        .ok_or(NormalizeError::FieldAbsent { field: "creation_time" })?;

    let severity_weight = normalizer.weights().severity_weight(&severity)?;
    let priority_weight = normalizer.weights().priority_weight(&priority)?;

    let sub_components = bug.sub_components.values().flatten().map(String::as_str);
    let area = normalizer.areas().classify_exclusive(sub_components.clone());
    let sub_component = normalizer
        .areas()
        .identifier(area)
        .and_then(|wanted| {
            sub_components
                .clone()
                .find(|candidate| candidate.trim().eq_ignore_ascii_case(wanted))
        })
        .or_else(|| sub_components.clone().next())
        .map(str::to_string);

    Ok(CanonicalIssue {
        backend: Backend::Bugzilla,
        id: bug.id.to_string(),
        assignee: non_empty(bug.assigned_to.as_deref()).map(str::to_string),
        status: map_status(STATUS_TABLE, status),
        created_at: parse_creation_time(created)?,
        severity,
        priority,
        severity_weight,
        priority_weight,
        area,
        is_customer_facing: false,
        summary: bug.summary.clone(),
        url: format!("{base_url}/show_bug.cgi?id={}", bug.id),
        component: bug.component.join(", "),
        sub_component,
        target_release: bug.target_release.clone(),
    })
}

fn parse_creation_time(value: &str) -> Result<DateTime<Utc>, NormalizeError> {
    NaiveDateTime::parse_from_str(value, CREATION_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| NormalizeError::Timestamp {
            value: value.to_string(),
        })
}

/// Which open bugs to pull from Bugzilla.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BugzillaQuery {
    pub product: String,
    pub components: Vec<String>,
    pub statuses: Vec<String>,
}

impl Default for BugzillaQuery {
    fn default() -> Self {
        Self {
            product: "OpenShift Container Platform".to_string(),
            components: vec!["Networking".to_string()],
            statuses: STATUS_TABLE
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }
}

impl BugzillaQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("product", self.product.clone()),
            ("include_fields", INCLUDE_FIELDS.to_string()),
        ];
        params.extend(self.components.iter().map(|c| ("component", c.clone())));
        params.extend(self.statuses.iter().map(|s| ("bug_status", s.clone())));
        params
    }
}

#[derive(Debug, Clone)]
pub struct BugzillaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    query: BugzillaQuery,
}

impl BugzillaClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, query: BugzillaQuery) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            query,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<BugzillaBug>, FetchError> {
        let url = format!("{}/rest/bug", self.base_url);
        debug!(%url, product = %self.query.product, "querying bugzilla");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&self.query.params())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                backend: Backend::Bugzilla,
                status,
            });
        }

        let body: BugSearchResponse = response.json().await.map_err(http_error)?;
        info!(count = body.bugs.len(), "fetched bugzilla bugs");
        Ok(body.bugs)
    }
}

fn http_error(source: reqwest::Error) -> FetchError {
    FetchError::Http {
        backend: Backend::Bugzilla,
        source,
    }
}
