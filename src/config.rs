use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::bugzilla::BugzillaQuery;
use crate::error::WeightTable;
use crate::jira::JiraQuery;
use crate::normalize::AreaIdentifiers;
use crate::roster::Roster;
use crate::weights::{threshold_is_valid, WeightTables, DEFAULT_STALE_THRESHOLD_DAYS};

const DEFAULT_BUGZILLA_URL: &str = "https://bugzilla.redhat.com";
const DEFAULT_JIRA_URL: &str = "https://issues.redhat.com";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level configuration, assembled from the environment and an optional
/// JSON file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bugzilla: BugzillaSettings,
    pub jira: JiraSettings,
    pub roster: Roster,
    pub weights: WeightTables,
    pub areas: AreaIdentifiers,
    pub stale_threshold_days: i64,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct BugzillaSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub query: BugzillaQuery,
}

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub url: String,
    pub token: Option<String>,
    pub query: JiraQuery,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Shape of the file named by `RANKER_CONFIG`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    roster: Vec<String>,
    severity_weights: Option<BTreeMap<String, u32>>,
    priority_weights: Option<BTreeMap<String, u32>>,
    stale_threshold_days: Option<i64>,
    areas: AreaIdentifiers,
    bugzilla: BugzillaQuery,
    jira: JiraQuery,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("stale threshold must be a non-negative number of days within range, got '{0}'")]
    InvalidThreshold(String),
    #[error("{table} weight for '{key}' is {weight}, outside {lo}..={hi}")]
    WeightOutOfRange {
        table: WeightTable,
        key: String,
        weight: u32,
        lo: u32,
        hi: u32,
    },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let file = match var("RANKER_CONFIG") {
            Some(path) => read_config_file(Path::new(&path))?,
            None => ConfigFile::default(),
        };

        let roster = match var("RANKER_ROSTER") {
            Some(list) => Roster::new(list.split(',')),
            None => Roster::new(&file.roster),
        };

        let defaults = WeightTables::default();
        let weights = WeightTables::new(
            file.severity_weights.unwrap_or(defaults.severity),
            file.priority_weights.unwrap_or(defaults.priority),
        );
        if let Some((table, key, weight)) = weights.out_of_range() {
            let (lo, hi) = match table {
                WeightTable::Severity => crate::weights::SEVERITY_RANGE,
                WeightTable::Priority => crate::weights::PRIORITY_RANGE,
            };
            return Err(ConfigError::WeightOutOfRange {
                table,
                key: key.to_string(),
                weight,
                lo,
                hi,
            });
        }

        let stale_threshold_days = match var("RANKER_STALE_DAYS") {
            Some(raw) => parse_threshold(&raw)?,
            None => file
                .stale_threshold_days
                .unwrap_or(DEFAULT_STALE_THRESHOLD_DAYS),
        };
        if !threshold_is_valid(stale_threshold_days) {
            return Err(ConfigError::InvalidThreshold(stale_threshold_days.to_string()));
        }

        Ok(Self {
            bugzilla: BugzillaSettings {
                url: var("BUGZILLA_URL").unwrap_or_else(|| DEFAULT_BUGZILLA_URL.to_string()),
                api_key: var("BUGZILLA_API_KEY"),
                query: file.bugzilla,
            },
            jira: JiraSettings {
                url: var("JIRA_URL").unwrap_or_else(|| DEFAULT_JIRA_URL.to_string()),
                token: var("JIRA_TOKEN"),
                query: file.jira,
            },
            roster,
            weights,
            areas: file.areas,
            stale_threshold_days,
            telemetry: TelemetryConfig {
                log_level: var("RANKER_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_threshold(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| threshold_is_valid(*days))
        .ok_or_else(|| ConfigError::InvalidThreshold(raw.to_string()))
}
