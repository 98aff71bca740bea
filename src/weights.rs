use std::collections::BTreeMap;

use chrono::Duration;

use crate::error::{NormalizeError, WeightTable};

pub const DEFAULT_STALE_THRESHOLD_DAYS: i64 = 30;

/// Non-negative and small enough to become a `chrono::Duration`.
pub fn threshold_is_valid(days: i64) -> bool {
    days >= 0 && Duration::try_days(days).is_some()
}

pub const SEVERITY_RANGE: (u32, u32) = (1, 10);
pub const PRIORITY_RANGE: (u32, u32) = (1, 150);

const DEFAULT_SEVERITY: &[(&str, u32)] = &[
    ("urgent", 10),
    ("critical", 10),
    ("high", 5),
    ("important", 5),
    ("medium", 3),
    ("moderate", 3),
    ("low", 1),
    ("unspecified", 1),
];

const DEFAULT_PRIORITY: &[(&str, u32)] = &[
    ("urgent", 150),
    ("blocker", 150),
    ("critical", 100),
    ("high", 50),
    ("major", 50),
    ("medium", 10),
    ("normal", 10),
    ("low", 1),
    ("minor", 1),
    ("unspecified", 1),
    ("undefined", 1),
];

/// Severity and priority vocabularies of both backends mapped to score weights.
/// Keys are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightTables {
    pub severity: BTreeMap<String, u32>,
    pub priority: BTreeMap<String, u32>,
}

impl Default for WeightTables {
    fn default() -> Self {
        Self::new(
            DEFAULT_SEVERITY.iter().map(|(k, v)| (k.to_string(), *v)),
            DEFAULT_PRIORITY.iter().map(|(k, v)| (k.to_string(), *v)),
        )
    }
}

impl WeightTables {
    pub fn new(
        severity: impl IntoIterator<Item = (String, u32)>,
        priority: impl IntoIterator<Item = (String, u32)>,
    ) -> Self {
        Self {
            severity: severity
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            priority: priority
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }

    pub fn severity_weight(&self, severity: &str) -> Result<u32, NormalizeError> {
        lookup(&self.severity, WeightTable::Severity, severity)
    }

    pub fn priority_weight(&self, priority: &str) -> Result<u32, NormalizeError> {
        lookup(&self.priority, WeightTable::Priority, priority)
    }

    /// Returns the first entry whose weight falls outside its table's range.
    pub fn out_of_range(&self) -> Option<(WeightTable, &str, u32)> {
        first_out_of_range(WeightTable::Severity, &self.severity, SEVERITY_RANGE).or_else(|| {
            first_out_of_range(WeightTable::Priority, &self.priority, PRIORITY_RANGE)
        })
    }
}

fn first_out_of_range(
    table: WeightTable,
    map: &BTreeMap<String, u32>,
    (lo, hi): (u32, u32),
) -> Option<(WeightTable, &str, u32)> {
    map.iter()
        .find(|(_, weight)| **weight < lo || **weight > hi)
        .map(|(key, weight)| (table, key.as_str(), *weight))
}

fn lookup(
    map: &BTreeMap<String, u32>,
    table: WeightTable,
    value: &str,
) -> Result<u32, NormalizeError> {
    map.get(value.trim().to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| NormalizeError::Lookup {
            table,
            value: value.to_string(),
        })
}
